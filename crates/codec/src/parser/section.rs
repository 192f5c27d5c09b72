use spliceasm_nodes::{
    DataSegment, ElementSegment, Export, FuncEntry, GlobalEntry, Import, MemoryEntry, Section,
    SectionContent, SectionKind, SectionMeta, Span, StartDirective, TableEntry, TypeEntry,
    VecCount,
};

use crate::{decoder::DecodeOptions, window::DecodeWindow, DecodeError};

use super::{code::decode_code_entry, custom_section::decode_custom_section, repeated, Decode};

/// Reads one section: id byte, declared length, then exactly that many bytes of body.
pub(crate) fn decode_section(
    window: &mut DecodeWindow,
    opts: &DecodeOptions,
) -> Result<Section, DecodeError> {
    let start = window.position();
    let id = window.take()?;
    let kind = SectionKind::from_id(id).ok_or(DecodeError::InvalidSection {
        kind: id,
        position: start,
    })?;
    let declared = window.take_var_u32()? as usize;
    let mut body = window.slice(declared)?;
    let body_span = Span::new(body.position(), declared);

    let mut count = None;
    let content = match kind {
        SectionKind::Custom => {
            SectionContent::Custom(decode_custom_section(&mut body, !opts.skip_name_section)?)
        }
        SectionKind::Type => {
            let (n, xs) = repeated(&mut body, TypeEntry::decode)?;
            count = Some(n);
            SectionContent::Type(xs)
        }
        SectionKind::Import => {
            let (n, xs) = repeated(&mut body, Import::decode)?;
            count = Some(n);
            SectionContent::Import(xs)
        }
        SectionKind::Function => {
            let (n, xs) = repeated(&mut body, FuncEntry::decode)?;
            count = Some(n);
            SectionContent::Function(xs)
        }
        SectionKind::Table => {
            let (n, xs) = repeated(&mut body, TableEntry::decode)?;
            count = Some(n);
            SectionContent::Table(xs)
        }
        SectionKind::Memory => {
            let (n, xs) = repeated(&mut body, MemoryEntry::decode)?;
            count = Some(n);
            SectionContent::Memory(xs)
        }
        SectionKind::Global => {
            let (n, xs) = repeated(&mut body, GlobalEntry::decode)?;
            count = Some(n);
            SectionContent::Global(xs)
        }
        SectionKind::Export => {
            let (n, xs) = repeated(&mut body, Export::decode)?;
            count = Some(n);
            SectionContent::Export(xs)
        }
        SectionKind::Start => SectionContent::Start(StartDirective::decode(&mut body)?),
        SectionKind::Element => {
            let (n, xs) = repeated(&mut body, ElementSegment::decode)?;
            count = Some(n);
            SectionContent::Element(xs)
        }
        SectionKind::Code => {
            let decode_body = !opts.skip_code;
            let (n, xs) = repeated(&mut body, |window| decode_code_entry(window, decode_body))?;
            count = Some(n);
            SectionContent::Code(xs)
        }
        SectionKind::Data if opts.skip_data => {
            // Only the count is read; the segments stay opaque bytes.
            let (value, span) = body.take_spanned_u32()?;
            count = Some(VecCount { value, span });
            body.take_rest();
            SectionContent::Skipped
        }
        SectionKind::Data => {
            let (n, xs) = repeated(&mut body, DataSegment::decode)?;
            count = Some(n);
            SectionContent::Data(xs)
        }
        SectionKind::DataCount => SectionContent::DataCount(body.take_var_u32()?),
    };

    if !body.is_empty() {
        return Err(DecodeError::SectionSizeMismatch {
            kind,
            declared,
            consumed: body.offset(),
            position: start,
        });
    }

    log::debug!(
        "{kind} section at {start}: {declared} bytes{}",
        count
            .map(|xs| format!(", {} entries", xs.value))
            .unwrap_or_default()
    );

    Ok(Section {
        meta: SectionMeta {
            kind,
            span: window.span_from(start),
            body: body_span,
            count,
        },
        content,
    })
}
