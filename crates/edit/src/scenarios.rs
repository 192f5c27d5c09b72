use spliceasm_codec::{decode, DecodeError, DecodeOptions};
use spliceasm_nodes::{
    ExportDesc, FuncIdx, FuncType, IndexSpace, Module, NumType, SectionKind, TypeIdx, ValType,
};

use crate::{
    test_utils::{assert_counts_consistent, assert_valid, decode_wat, redecode, section_bytes},
    transform, EditError, NewEntry, Rules,
};

const WEBPACK_LIKE: &str = r#"
    (module
      (import "env" "log" (func $log (param i32)))
      (memory (export "memory") 1)
      (global $counter (mut i32) (i32.const 0))
      (table 2 funcref)
      (elem (i32.const 0) $foo $bar)
      (func $foo (export "foo") (result i32)
        global.get $counter)
      (func $bar (export "bar") (param i32)
        local.get 0
        call $log
        call $foo
        drop)
      (func $init
        i32.const 1
        global.set $counter)
      (start $init)
      (data (i32.const 8) "spliceasm")
    )
"#;

#[test]
fn empty_rules_are_identity() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat(WEBPACK_LIKE)?;
    assert_eq!(transform(&bytes, &module, &mut Rules::new())?, bytes);
    Ok(())
}

#[test]
fn appending_to_export_names() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat(WEBPACK_LIKE)?;
    let mut rules = Rules::new().on_export(|export| {
        if export.name() == "foo" {
            export.set_name("foo!!");
        }
    });

    let out = transform(&bytes, &module, &mut rules)?;
    assert_valid(&out)?;
    assert_eq!(out.len(), bytes.len() + 2);

    let edited = redecode(&out)?;
    let names: Vec<_> = edited
        .export_section()
        .iter()
        .map(|xs| xs.name.as_str())
        .collect();
    assert_eq!(names, vec!["memory", "foo!!", "bar"]);
    assert_counts_consistent(&module, &edited, &[]);
    Ok(())
}

#[test]
fn removing_the_start_directive_drops_its_section() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat(WEBPACK_LIKE)?;
    let start = module
        .section_metadata(SectionKind::Start)
        .expect("fixture has a start section")
        .span;

    let mut rules = Rules::new().on_start(|start| start.remove());
    let out = transform(&bytes, &module, &mut rules)?;

    assert_eq!(out.len(), bytes.len() - start.len);
    assert_valid(&out)?;
    assert!(redecode(&out)?.start_section().is_none());
    Ok(())
}

#[test]
fn removing_every_export_keeps_an_empty_section() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat(WEBPACK_LIKE)?;
    let mut rules = Rules::new().on_export(|export| export.remove());
    let out = transform(&bytes, &module, &mut rules)?;

    assert_valid(&out)?;
    let edited = redecode(&out)?;
    assert!(edited.export_section().is_empty());
    assert_eq!(
        edited
            .section_metadata(SectionKind::Export)
            .and_then(|xs| xs.count)
            .map(|xs| xs.value),
        Some(0)
    );
    assert_counts_consistent(&module, &edited, &[(SectionKind::Export, -3)]);
    Ok(())
}

#[test]
fn short_buffers_fail_to_decode() -> anyhow::Result<()> {
    let (bytes, _) = decode_wat(WEBPACK_LIKE)?;
    let err = decode(&bytes[..bytes.len() - 3], &DecodeOptions::default())
        .expect_err("the last section is cut short");
    assert!(matches!(err, DecodeError::TruncatedInput { .. }), "{err:?}");
    Ok(())
}

#[test]
fn long_renames_shift_but_preserve_later_sections() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat(WEBPACK_LIKE)?;
    let long = "x".repeat(40);
    let mut rules = Rules::new().on_export(|export| {
        if export.name() == "bar" {
            export.set_name(long.clone());
        }
    });

    let out = transform(&bytes, &module, &mut rules)?;
    assert_valid(&out)?;
    let edited = redecode(&out)?;
    assert_eq!(edited.export_section()[2].name.as_str(), long);
    assert_counts_consistent(&module, &edited, &[]);

    // "bar" becomes forty bytes; both length prefixes still fit in one byte.
    let body_len = |module: &Module| {
        module
            .section_metadata(SectionKind::Export)
            .map(|xs| xs.body.len)
            .unwrap_or_default()
    };
    assert_eq!(body_len(&edited), body_len(&module) + 37);
    assert_eq!(out.len(), bytes.len() + 37);

    for kind in [
        SectionKind::Start,
        SectionKind::Element,
        SectionKind::Code,
        SectionKind::Data,
    ] {
        let before = section_bytes(&bytes, &module, kind);
        let after = section_bytes(&out, &edited, kind);
        assert!(!before.is_empty());
        assert_eq!(before, after, "{kind} section changed");
    }
    assert_eq!(
        section_bytes(&bytes, &module, SectionKind::Type),
        section_bytes(&out, &edited, SectionKind::Type)
    );
    Ok(())
}

#[test]
fn renaming_imports() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat(WEBPACK_LIKE)?;
    let mut rules = Rules::new().on_import(|import| {
        let field = format!("{}!!", import.field());
        import.set_field(field);
    });
    let out = transform(&bytes, &module, &mut rules)?;
    assert_valid(&out)?;

    let edited = redecode(&out)?;
    let import = &edited.import_section()[0];
    assert_eq!(import.module.as_str(), "env");
    assert_eq!(import.field.as_str(), "log!!");
    Ok(())
}

#[test]
fn adding_a_function_with_an_export() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat(WEBPACK_LIKE)?;
    let type_idx = module.next_type_index();
    let func_idx = module.next_func_index();

    let mut rules = Rules::new()
        .insert(NewEntry::Type(FuncType::default()))
        .insert(NewEntry::Func {
            type_idx: TypeIdx(type_idx),
            locals: vec![],
            body: vec![0x0b],
        })
        .insert(NewEntry::Export {
            name: "__webpack_init__".to_string(),
            desc: ExportDesc::Func(FuncIdx(func_idx)),
        });

    let out = transform(&bytes, &module, &mut rules)?;
    assert_valid(&out)?;

    let edited = redecode(&out)?;
    assert_counts_consistent(
        &module,
        &edited,
        &[
            (SectionKind::Type, 1),
            (SectionKind::Function, 1),
            (SectionKind::Export, 1),
            (SectionKind::Code, 1),
        ],
    );
    assert_eq!(edited.function_section().len(), module.function_section().len() + 1);
    assert_eq!(edited.code_section().len(), module.code_section().len() + 1);
    let export = edited
        .export_section()
        .iter()
        .find(|xs| xs.name.as_str() == "__webpack_init__")
        .expect("export was added");
    // One imported function precedes the three defined ones.
    assert_eq!(export.desc, ExportDesc::Func(FuncIdx(4)));
    assert_eq!(edited.func_type(4), Some(type_idx));
    Ok(())
}

#[test]
fn inserting_creates_missing_sections() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat("(module (memory 1))")?;
    let mut rules = Rules::new()
        .insert(NewEntry::Type(FuncType::new(
            vec![ValType::NumType(NumType::I32)],
            vec![],
        )))
        .insert(NewEntry::Func {
            type_idx: TypeIdx(0),
            locals: vec![],
            body: vec![0x0b],
        })
        .insert(NewEntry::Export {
            name: "f".to_string(),
            desc: ExportDesc::Func(FuncIdx(0)),
        });

    let out = transform(&bytes, &module, &mut rules)?;
    assert_valid(&out)?;
    let kinds: Vec<_> = redecode(&out)?.sections().iter().map(|xs| xs.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            SectionKind::Type,
            SectionKind::Function,
            SectionKind::Memory,
            SectionKind::Export,
            SectionKind::Code,
        ]
    );
    Ok(())
}

#[test]
fn removing_a_function_renumbers_later_references() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat(
        r#"(module
             (func $a (result i32) i32.const 1)
             (func $b (result i32) i32.const 2)
             (func $c (export "c") (result i32)
               call $a
               call $c
               i32.add)
             (table funcref (elem $a $c)))"#,
    )?;

    let mut rules = Rules::new().on_func(|func| {
        if func.index() == Some(1) {
            func.remove();
        }
    });
    let out = transform(&bytes, &module, &mut rules)?;
    assert_valid(&out)?;

    let edited = redecode(&out)?;
    assert_counts_consistent(
        &module,
        &edited,
        &[(SectionKind::Function, -1), (SectionKind::Code, -1)],
    );
    assert_eq!(edited.function_section().len(), 2);
    assert_eq!(edited.code_section().len(), 2);
    assert_eq!(edited.export_section()[0].desc, ExportDesc::Func(FuncIdx(1)));

    let calls: Vec<_> = edited.code_section()[1]
        .refs
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|xs| xs.value)
        .collect();
    assert_eq!(calls, vec![0, 1]);

    let table: Vec<_> = edited.element_section()[0]
        .refs
        .iter()
        .filter(|xs| xs.space == IndexSpace::Func)
        .map(|xs| xs.value)
        .collect();
    assert_eq!(table, vec![0, 1]);

    // Operands are rewritten in place, so the surviving code entries keep their size.
    assert_eq!(
        edited.code_section()[1].span.len,
        module.code_section()[2].span.len
    );
    Ok(())
}

#[test]
fn removing_an_imported_function_shifts_defined_ones() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat(
        r#"(module
             (import "env" "unused" (func))
             (func $f (export "f"))
             (func (export "g") call $f))"#,
    )?;

    let mut rules = Rules::new().on_import(|import| import.remove());
    let out = transform(&bytes, &module, &mut rules)?;
    assert_valid(&out)?;

    let edited = redecode(&out)?;
    let exports: Vec<_> = edited.export_section().iter().map(|xs| xs.desc).collect();
    assert_eq!(
        exports,
        vec![ExportDesc::Func(FuncIdx(0)), ExportDesc::Func(FuncIdx(1))]
    );
    Ok(())
}

#[test]
fn removing_a_referenced_function_is_reported() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat(WEBPACK_LIKE)?;
    let mut rules = Rules::new().on_func(|func| {
        // $init, referenced by the start directive.
        if func.index() == Some(3) {
            func.remove();
        }
    });

    let err = transform(&bytes, &module, &mut rules).expect_err("start still points at $init");
    let start = module.start_section().expect("start").func.span.start;
    assert_eq!(
        err,
        EditError::DanglingReference {
            space: IndexSpace::Func,
            index: 3,
            at: start
        }
    );

    // Removing the start directive too resolves it.
    let mut rules = Rules::new()
        .on_func(|func| {
            if func.index() == Some(3) {
                func.remove();
            }
        })
        .on_start(|start| start.remove());
    let out = transform(&bytes, &module, &mut rules)?;
    assert_valid(&out)?;
    Ok(())
}

#[test]
fn inserted_exports_must_point_somewhere() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat(WEBPACK_LIKE)?;
    let mut rules = Rules::new().insert(NewEntry::Export {
        name: "nowhere".to_string(),
        desc: ExportDesc::Func(FuncIdx(module.next_func_index())),
    });
    assert!(matches!(
        transform(&bytes, &module, &mut rules),
        Err(EditError::DanglingReference {
            space: IndexSpace::Func,
            ..
        })
    ));
    Ok(())
}

#[test]
fn undecoded_code_blocks_renumbering() -> anyhow::Result<()> {
    let (bytes, _) = decode_wat(WEBPACK_LIKE)?;
    let module = decode(&bytes, &DecodeOptions::declarations_only())?;

    let mut rules = Rules::new().on_func(|func| {
        if func.index() == Some(1) {
            func.remove();
        }
    });
    assert!(matches!(
        transform(&bytes, &module, &mut rules),
        Err(EditError::OpaqueReferences {
            space: IndexSpace::Func,
            section: SectionKind::Code
        })
    ));

    // Edits that leave every index space alone still work without the bodies.
    let mut rules = Rules::new()
        .on_export(|export| export.remove())
        .on_start(|start| start.remove());
    let out = transform(&bytes, &module, &mut rules)?;
    assert_valid(&out)?;
    Ok(())
}

#[test]
fn removed_nodes_discard_their_renames() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat(WEBPACK_LIKE)?;
    let mut rules = Rules::new().on_export(|export| {
        let name = format!("{}-renamed", export.name());
        export.set_name(name);
        if export.node().name.as_str() == "foo" {
            export.remove();
        }
    });
    let out = transform(&bytes, &module, &mut rules)?;
    assert_valid(&out)?;
    let names: Vec<_> = redecode(&out)?
        .export_section()
        .iter()
        .map(|xs| xs.name.value.clone())
        .collect();
    assert_eq!(names, vec!["memory-renamed", "bar-renamed"]);
    Ok(())
}

#[test]
fn removing_an_implicitly_used_memory_is_reported() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat(
        r#"(module
             (import "env" "memory" (memory 1))
             (func (export "peek") (result i32)
               i32.const 0
               i32.load)
             (data (i32.const 0) "x"))"#,
    )?;
    let load = module.code_section()[0]
        .refs
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|xs| xs.is_implicit())
        .copied()
        .expect("the load names memory 0");

    let mut rules = Rules::new().on_import(|import| import.remove());
    assert_eq!(
        transform(&bytes, &module, &mut rules),
        Err(EditError::DanglingReference {
            space: IndexSpace::Memory,
            index: 0,
            at: load.span.start
        })
    );

    // Only the data segment uses it here.
    let (bytes, module) = decode_wat(
        r#"(module
             (import "env" "memory" (memory 1))
             (data (i32.const 0) "x"))"#,
    )?;
    let mut rules = Rules::new().on_import(|import| import.remove());
    assert!(matches!(
        transform(&bytes, &module, &mut rules),
        Err(EditError::DanglingReference {
            space: IndexSpace::Memory,
            index: 0,
            ..
        })
    ));
    Ok(())
}

#[test]
fn removing_an_implicitly_used_table_is_reported() -> anyhow::Result<()> {
    let (bytes, module) = decode_wat(
        r#"(module
             (import "env" "table" (table 1 funcref))
             (func $f)
             (elem (i32.const 0) $f))"#,
    )?;
    let mut rules = Rules::new().on_import(|import| import.remove());
    assert!(matches!(
        transform(&bytes, &module, &mut rules),
        Err(EditError::DanglingReference {
            space: IndexSpace::Table,
            index: 0,
            ..
        })
    ));

    // Nothing uses the table once the segment names none; removing it is fine.
    let (bytes, module) = decode_wat(
        r#"(module
             (import "env" "table" (table 1 funcref))
             (import "env" "memory" (memory 1))
             (func (export "f")))"#,
    )?;
    let mut rules = Rules::new().on_import(|import| import.remove());
    let out = transform(&bytes, &module, &mut rules)?;
    assert_valid(&out)?;
    assert!(redecode(&out)?.import_section().is_empty());
    Ok(())
}
