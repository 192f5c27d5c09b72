use spliceasm_nodes::{CustomSection, Span};

use crate::{window::DecodeWindow, DecodeError};

use super::names::decode_name_map;

pub(crate) const NAME_SECTION: &str = "name";

/// Reads a custom section body. The `name` section's payload is interpreted when
/// `parse_names` is set; a malformed one is reported and otherwise ignored, since custom
/// sections never affect whether a module is valid.
pub(crate) fn decode_custom_section(
    window: &mut DecodeWindow,
    parse_names: bool,
) -> Result<CustomSection, DecodeError> {
    let name = window.take_name()?;
    let payload_span = Span::new(window.position(), window.available());
    let mut payload = window.slice(window.available())?;

    let names = if parse_names && name.as_str() == NAME_SECTION {
        match decode_name_map(&mut payload) {
            Ok(names) => Some(names),
            Err(err) => {
                log::warn!("ignoring malformed name section: {err}");
                None
            }
        }
    } else {
        None
    };

    Ok(CustomSection {
        name,
        payload: payload_span,
        names,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keeps_arbitrary_payloads_opaque() -> anyhow::Result<()> {
        let mut window = DecodeWindow::new(b"\x04blob\x01\x02\x03");
        let custom = decode_custom_section(&mut window, true)?;
        assert_eq!(custom.name.as_str(), "blob");
        assert_eq!(custom.payload, Span::new(5, 3));
        assert_eq!(custom.names, None);
        assert!(window.is_empty());
        Ok(())
    }

    #[test]
    fn parses_the_name_section_on_request() -> anyhow::Result<()> {
        let bytes = b"\x04name\x00\x02\x01m";
        let custom = decode_custom_section(&mut DecodeWindow::new(bytes), true)?;
        assert_eq!(
            custom.names.and_then(|xs| xs.module),
            Some("m".to_string())
        );

        let custom = decode_custom_section(&mut DecodeWindow::new(bytes), false)?;
        assert_eq!(custom.names, None);
        Ok(())
    }

    #[test]
    fn malformed_name_sections_are_ignored() -> anyhow::Result<()> {
        let custom = decode_custom_section(&mut DecodeWindow::new(b"\x04name\x00\x09"), true)?;
        assert_eq!(custom.names, None);
        assert_eq!(custom.payload, Span::new(5, 2));
        Ok(())
    }
}
