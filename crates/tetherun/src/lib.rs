//! # tetherun
//!
//! Synchronous access to a WebAssembly module executing inside a remote
//! debugger.
//!
//! The module runs remotely; locally its exports look like ordinary objects.
//! Calling a function or touching memory blocks the calling thread while a
//! separate transport context keeps the socket serviced, including host
//! callbacks the remote module makes in the middle of a call.
//!
//! ```ignore
//! let config = tetherun::Config::from_env();
//! let imports = tetherun::Imports::new().func("env", "print", |args| {
//!     println!("{:?}", args);
//!     Ok(None)
//! });
//! let (module, instance) = tetherun::instantiate_bytes(&wasm, imports, &config).await?;
//! let answer = instance.call("ret_42", &[])?;
//! tetherun::destroy(module).await?;
//! ```

pub mod channel;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod handoff;
pub mod instance;
pub mod logging;
pub mod memory;
pub mod message;
pub mod mock_transport;
pub mod module;
pub mod rpc;
pub mod transport;
pub mod websocket;

pub use config::Config;
pub use instance::Export;
pub use instance::Function;
pub use instance::Imports;
pub use instance::Instance;
pub use memory::DataView;
pub use memory::Memory;
pub use memory::RemoteMemory;
pub use memory::TypedArray;
pub use module::Module;
pub use module::compile;
pub use module::destroy;
pub use module::instantiate;
pub use module::instantiate_bytes;
pub use tetherpc::WasmValue;
