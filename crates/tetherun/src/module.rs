//! # Modules
//!
//! Entry points for running a module remotely: `compile` ships the module
//! bytes to the remote debugger, `instantiate` binds the exports it reported
//! to local host imports, `destroy` tears the connection down.
//!
//! ## Handshake
//!
//! 1. Spawn the transport context and post `Configure`.
//! 2. Await `SetConfiguration`, then `OnSocketOpen`.
//! 3. Send the module bytes as a binary frame.
//! 4. Await `Init`, which lists the exports.

use std::sync::Arc;

use tracing::info;

use tetherpc::BinaryResponseKind;
use tetherpc::InitResponse;
use tetherpc::TextRequest;
use tetherpc::VersionResponse;
use tetherpc::WasmExport;

use crate::channel;
use crate::channel::ChannelClient;
use crate::config::Config;
use crate::context::ContextSpawner;
use crate::context::ThreadSpawner;
use crate::instance::Imports;
use crate::instance::Instance;
use crate::message::ContextRequest;
use crate::message::ContextResponseKind;
use crate::rpc;
use crate::rpc::RpcClient;
use crate::transport::Connector;
use crate::websocket::WebSocketConnector;

#[derive(Debug)]
pub enum Error {
    Channel(channel::Error),
    Rpc(rpc::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(e) => write!(f, "Channel error: {}", e),
            Self::Rpc(e) => write!(f, "RPC error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Channel(e) => Some(e),
            Self::Rpc(e) => Some(e),
        }
    }
}

impl From<channel::Error> for Error {
    fn from(e: channel::Error) -> Self {
        Self::Channel(e)
    }
}

impl From<rpc::Error> for Error {
    fn from(e: rpc::Error) -> Self {
        Self::Rpc(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A module loaded into the remote debugger.
pub struct Module {
    exports: Vec<WasmExport>,
    rpc: RpcClient,
}

impl Module {
    /// Connects to `config.socket_addr` over WebSocket and loads `bytes`.
    pub async fn compile(bytes: &[u8], config: &Config) -> Result<Self> {
        let connector = Arc::new(WebSocketConnector::new());
        Self::compile_with(bytes, config, connector, &ThreadSpawner::new()).await
    }

    pub async fn compile_with(
        bytes: &[u8],
        config: &Config,
        connector: Arc<dyn Connector>,
        spawner: &dyn ContextSpawner,
    ) -> Result<Self> {
        let channel = ChannelClient::spawn(config.clone(), connector, spawner)?;
        let rpc = RpcClient::new(Arc::new(channel));

        match handshake(&rpc, bytes, config).await {
            Ok(exports) => {
                info!(exports = exports.len(), "module loaded");
                Ok(Self { exports, rpc })
            }
            Err(e) => {
                // stop the transport context; the handshake error is what matters
                let _ = rpc.channel().terminate().await;
                Err(e)
            }
        }
    }

    /// Exports as reported by the remote side.
    pub fn exports(&self) -> &[WasmExport] {
        &self.exports
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Version string of the remote debugger.
    pub async fn version(&self) -> Result<String> {
        self.rpc.text_request(&TextRequest::Version, false)?;
        let response = self.rpc.text_response::<VersionResponse>().await?;
        Ok(response.value)
    }

    /// Snapshot of the module's memory right after initialization.
    pub async fn initial_memory(&self) -> Result<Vec<u8>> {
        self.rpc.text_request(&TextRequest::InitMemory, false)?;
        let bytes = self.rpc.binary_response(BinaryResponseKind::InitMemory).await?;
        Ok(bytes)
    }

    pub fn instantiate(&self, imports: Imports) -> Instance {
        Instance::new(&self.exports, imports, &self.rpc)
    }

    /// Closes the connection and stops the transport context.
    pub async fn destroy(self) -> Result<()> {
        self.rpc.channel().terminate().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module").field("exports", &self.exports).finish()
    }
}

async fn handshake(rpc: &RpcClient, bytes: &[u8], config: &Config) -> Result<Vec<WasmExport>> {
    let channel = rpc.channel();
    channel.post_request(ContextRequest::Configure(config.transport()), false)?;
    channel.receive(ContextResponseKind::SetConfiguration).await?;
    channel.receive(ContextResponseKind::OnSocketOpen).await?;

    rpc.binary_request(bytes.to_vec(), false)?;
    let init = rpc.text_response::<InitResponse>().await?;
    Ok(init.exports)
}

pub async fn compile(bytes: &[u8], config: &Config) -> Result<Module> {
    Module::compile(bytes, config).await
}

pub fn instantiate(module: &Module, imports: Imports) -> Instance {
    module.instantiate(imports)
}

/// Compiles and instantiates in one step.
pub async fn instantiate_bytes(bytes: &[u8], imports: Imports, config: &Config) -> Result<(Module, Instance)> {
    let module = Module::compile(bytes, config).await?;
    let instance = module.instantiate(imports);
    Ok((module, instance))
}

pub async fn destroy(module: Module) -> Result<()> {
    module.destroy().await
}
