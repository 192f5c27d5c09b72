//! Checks an edited module two independent ways: by decoding it again with our own decoder and by
//! handing it to a native loader. Both outcomes are always reported; neither masks the other.

use std::future::Future;

use thiserror::Error;

use spliceasm_codec::{decode, DecodeError, DecodeOptions};
use spliceasm_edit::{EditError, Pipeline};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("{message} (at offset {offset})")]
    Rejected { message: String, offset: usize },

    #[error("loader task did not complete: {0}")]
    Task(String),
}

/// Something that accepts or rejects raw module bytes, the way an engine would when compiling.
pub trait NativeLoader: Send + Sync {
    fn compile(&self, bytes: Vec<u8>) -> impl Future<Output = Result<(), LoadError>> + Send;
}

/// Validates with `wasmparser` on tokio's blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct WasmparserLoader;

impl NativeLoader for WasmparserLoader {
    fn compile(&self, bytes: Vec<u8>) -> impl Future<Output = Result<(), LoadError>> + Send {
        async move {
            tokio::task::spawn_blocking(move || {
                wasmparser::Validator::new()
                    .validate_all(&bytes)
                    .map(|_| ())
                    .map_err(|e| LoadError::Rejected {
                        message: e.message().to_string(),
                        offset: e.offset(),
                    })
            })
            .await
            .map_err(|e| LoadError::Task(e.to_string()))?
        }
    }
}

/// The outcome of both checks. `None` means that check passed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Verdict {
    pub self_decode: Option<DecodeError>,
    pub native_load: Option<LoadError>,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.self_decode.is_none() && self.native_load.is_none()
    }
}

/// Decodes `bytes` and loads them with `loader`. Never modifies `bytes`, so repeated calls give
/// the same verdict.
pub async fn verify<L: NativeLoader>(loader: &L, bytes: &[u8]) -> Verdict {
    let self_decode = decode(bytes, &DecodeOptions::default()).err();
    let native_load = loader.compile(bytes.to_vec()).await.err();

    if let Some(err) = &self_decode {
        log::debug!("self-decode failed: {err}");
    }
    if let Some(err) = &native_load {
        log::debug!("native load failed: {err}");
    }

    Verdict {
        self_decode,
        native_load,
    }
}

/// Verifies a re-encoded pipeline's output and moves it to `Verified`, or to `Failed` if either
/// check rejects the bytes.
pub async fn verify_pipeline<L: NativeLoader>(
    loader: &L,
    pipeline: &mut Pipeline<'_>,
) -> Result<Verdict, EditError> {
    let verdict = match pipeline.output() {
        Some(bytes) => verify(loader, bytes).await,
        None => {
            return Err(EditError::OutOfOrder {
                stage: pipeline.stage(),
                action: "verify",
            })
        }
    };
    pipeline.verified(verdict.passed())?;
    Ok(verdict)
}
