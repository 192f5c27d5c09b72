use spliceasm_codec::{decode, DecodeOptions};
use spliceasm_nodes::{Module, SectionKind};

pub(crate) fn decode_wat(source: &str) -> anyhow::Result<(Vec<u8>, Module)> {
    let bytes = wat::parse_str(source)?;
    let module = decode(&bytes, &DecodeOptions::default())
        .map_err(|e| anyhow::anyhow!(r#"failed to decode fixture; error="{e:?}""#))?;
    Ok((bytes, module))
}

pub(crate) fn redecode(bytes: &[u8]) -> anyhow::Result<Module> {
    Ok(decode(bytes, &DecodeOptions::default())?)
}

/// Ground truth: the edited bytes must be a valid module.
pub(crate) fn assert_valid(bytes: &[u8]) -> anyhow::Result<()> {
    wasmparser::Validator::new()
        .validate_all(bytes)
        .map_err(|e| anyhow::anyhow!("edited module failed validation: {e}"))?;
    Ok(())
}

pub(crate) fn section_bytes<'a>(bytes: &'a [u8], module: &Module, kind: SectionKind) -> &'a [u8] {
    module
        .section_metadata(kind)
        .map(|xs| &bytes[xs.span.range()])
        .unwrap_or_default()
}

/// Every vector section's declared count in `after` equals its count in `before` plus the
/// expected change; kinds missing from `changes` must keep their count. A section absent from
/// `before` counts as zero.
pub(crate) fn assert_counts_consistent(
    before: &Module,
    after: &Module,
    changes: &[(SectionKind, i64)],
) {
    let count = |module: &Module, kind| {
        module
            .section_metadata(kind)
            .and_then(|xs| xs.count)
            .map_or(0, |xs| i64::from(xs.value))
    };
    for section in before.sections().iter().chain(after.sections()) {
        let kind = section.kind();
        if section.meta.count.is_none() {
            continue;
        }
        let delta = changes
            .iter()
            .find(|(changed, _)| *changed == kind)
            .map_or(0, |(_, delta)| *delta);
        assert_eq!(
            count(after, kind),
            count(before, kind) + delta,
            "{kind} section count"
        );
    }
}
