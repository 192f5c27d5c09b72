use spliceasm_nodes::{Module, ModuleBuilder, MAGIC, PREAMBLE_LEN, VERSION};

use crate::{decoder::DecodeOptions, window::DecodeWindow, DecodeError};

use super::section::decode_section;

pub(crate) fn decode_module(bytes: &[u8], opts: &DecodeOptions) -> Result<Module, DecodeError> {
    let mut window = DecodeWindow::new(bytes);
    if window.available() < PREAMBLE_LEN {
        return Err(DecodeError::TruncatedInput {
            position: 0,
            wanted: PREAMBLE_LEN,
            available: window.available(),
        });
    }

    let magic = window.take_n(MAGIC.len())?;
    if magic != MAGIC {
        return Err(DecodeError::InvalidMagic(u32::from_be_bytes([
            magic[0], magic[1], magic[2], magic[3],
        ])));
    }

    let version = window.take_u32_le()?;
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let mut builder = ModuleBuilder::new(bytes.len());
    while !window.is_empty() {
        builder = builder.section(decode_section(&mut window, opts)?)?;
    }
    Ok(builder.build())
}
