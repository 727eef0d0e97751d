//! # Export Invocation Layer
//!
//! Presents the exports of a remote module as local objects. Calling a
//! function export blocks until the remote side produces a result, servicing
//! any host callbacks it issues along the way.
//!
//! ## Call Loop
//!
//! ```text
//! CallExported ──► AwaitingResult ──CallResult──► done
//!                      │    ▲
//!               CallHost    │ CallResult (host answer)
//!                      ▼    │
//!              AwaitingHostCallAnswer
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use tetherpc::CallHostResponse;
use tetherpc::ExportKind;
use tetherpc::FrameKind;
use tetherpc::SocketFrame;
use tetherpc::TextRequest;
use tetherpc::TextResponse;
use tetherpc::TextResponseKind;
use tetherpc::WasmExport;
use tetherpc::WasmValue;

use crate::memory::Memory;
use crate::memory::RemoteMemory;
use crate::rpc;
use crate::rpc::RpcClient;

#[derive(Debug)]
pub enum Error {
    Rpc(rpc::Error),
    Wire(tetherpc::Error),
    UnexpectedFrame(FrameKind),
    UnexpectedResponse(TextResponseKind),
    ExportNotFound(String),
    ImportNotFound {
        module: String,
        field: String,
    },
    ImportFailed {
        module: String,
        field: String,
        source: anyhow::Error,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rpc(e) => write!(f, "RPC error: {}", e),
            Self::Wire(e) => write!(f, "Wire error: {}", e),
            Self::UnexpectedFrame(kind) => write!(f, "Expected TextResponse but received {}", kind),
            Self::UnexpectedResponse(kind) => {
                write!(f, "Expected CallResult or CallHost but received {}", kind)
            }
            Self::ExportNotFound(name) => write!(f, "Export '{}' not found", name),
            Self::ImportNotFound { module, field } => {
                write!(f, "Import '{}.{}' not found", module, field)
            }
            Self::ImportFailed { module, field, source } => {
                write!(f, "Import '{}.{}' failed: {}", module, field, source)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rpc(e) => Some(e),
            Self::Wire(e) => Some(e),
            Self::ImportFailed { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

impl From<rpc::Error> for Error {
    fn from(e: rpc::Error) -> Self {
        Self::Rpc(e)
    }
}

impl From<tetherpc::Error> for Error {
    fn from(e: tetherpc::Error) -> Self {
        Self::Wire(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A host function the remote module may call back into.
pub type HostFunc = Arc<dyn Fn(&[WasmValue]) -> anyhow::Result<Option<WasmValue>> + Send + Sync>;

/// Host functions keyed by module and field name.
#[derive(Clone, Default)]
pub struct Imports {
    modules: HashMap<String, HashMap<String, HostFunc>>,
}

impl Imports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn func<F>(mut self, module: impl Into<String>, field: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[WasmValue]) -> anyhow::Result<Option<WasmValue>> + Send + Sync + 'static,
    {
        self.modules
            .entry(module.into())
            .or_default()
            .insert(field.into(), Arc::new(func));
        self
    }

    pub fn get(&self, module: &str, field: &str) -> Option<&HostFunc> {
        self.modules.get(module)?.get(field)
    }
}

impl std::fmt::Debug for Imports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self
            .modules
            .iter()
            .flat_map(|(module, fields)| fields.keys().map(move |field| format!("{}.{}", module, field)))
            .collect();
        names.sort();
        f.debug_struct("Imports").field("funcs", &names).finish()
    }
}

enum CallState {
    AwaitingResult,
    AwaitingHostCallAnswer(CallHostResponse),
}

/// A function export of a remote instance.
#[derive(Clone)]
pub struct Function {
    name: String,
    rpc: RpcClient,
    imports: Arc<Imports>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the export and blocks until it returns.
    pub fn call(&self, args: &[WasmValue]) -> Result<Option<WasmValue>> {
        let request = TextRequest::CallExported {
            name: self.name.clone(),
            args: args.iter().map(WasmValue::to_number).collect(),
        };
        self.rpc.text_request(&request, true)?;

        let mut state = CallState::AwaitingResult;
        loop {
            state = match state {
                CallState::AwaitingResult => match self.next_response()? {
                    TextResponse::CallResult(result) => {
                        return Ok(result.values.into_iter().next());
                    }
                    TextResponse::CallHost(call) => CallState::AwaitingHostCallAnswer(call),
                    other => return Err(Error::UnexpectedResponse(other.kind())),
                },
                CallState::AwaitingHostCallAnswer(call) => {
                    let answer = self.call_host(&call)?;
                    let reply = TextRequest::CallResult {
                        values: vec![answer.map(|value| value.to_number())],
                    };
                    self.rpc.text_request(&reply, true)?;
                    CallState::AwaitingResult
                }
            };
        }
    }

    fn next_response(&self) -> Result<TextResponse> {
        match self.rpc.blocking_receive()? {
            SocketFrame::Text(body) => Ok(tetherpc::decode_response(&body)?),
            frame => Err(Error::UnexpectedFrame(frame.kind())),
        }
    }

    fn call_host(&self, call: &CallHostResponse) -> Result<Option<WasmValue>> {
        let CallHostResponse { module, field, args } = call;
        if self.rpc.channel().config().debug_enabled {
            debug!(export = %self.name, "host call {}.{}({:?})", module, field, args);
        }

        let func = self.imports.get(module, field).ok_or_else(|| Error::ImportNotFound {
            module: module.clone(),
            field: field.clone(),
        })?;

        func(args).map_err(|source| Error::ImportFailed {
            module: module.clone(),
            field: field.clone(),
            source,
        })
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone)]
pub enum Export {
    Function(Function),
    Memory(Memory),
}

/// The exports of a remote module, bound to a set of host imports.
#[derive(Debug, Clone)]
pub struct Instance {
    exports: HashMap<String, Export>,
}

impl Instance {
    pub(crate) fn new(descriptors: &[WasmExport], imports: Imports, rpc: &RpcClient) -> Self {
        let imports = Arc::new(imports);
        let mut exports = HashMap::new();

        for descriptor in descriptors {
            let export = match &descriptor.kind {
                ExportKind::Function => Export::Function(Function {
                    name: descriptor.name.clone(),
                    rpc: rpc.clone(),
                    imports: imports.clone(),
                }),
                ExportKind::Memory { memory_size } => {
                    let buffer = RemoteMemory::new(
                        descriptor.name.as_str(),
                        0,
                        *memory_size as usize,
                        rpc.clone(),
                    );
                    Export::Memory(Memory::new(buffer))
                }
                kind @ (ExportKind::Global | ExportKind::Table) => {
                    warn!("exporting {} '{}' is not supported yet", kind, descriptor.name);
                    continue;
                }
            };
            exports.insert(descriptor.name.clone(), export);
        }

        Self { exports }
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }

    pub fn get_func(&self, name: &str) -> Option<&Function> {
        match self.exports.get(name)? {
            Export::Function(func) => Some(func),
            Export::Memory(_) => None,
        }
    }

    pub fn get_memory(&self, name: &str) -> Option<&Memory> {
        match self.exports.get(name)? {
            Export::Memory(memory) => Some(memory),
            Export::Function(_) => None,
        }
    }

    pub fn exports(&self) -> impl Iterator<Item = (&str, &Export)> {
        self.exports.iter().map(|(name, export)| (name.as_str(), export))
    }

    /// Calls the function export `name`.
    pub fn call(&self, name: &str, args: &[WasmValue]) -> Result<Option<WasmValue>> {
        self.get_func(name)
            .ok_or_else(|| Error::ExportNotFound(name.to_string()))?
            .call(args)
    }
}
