//! A loopback debugger: plays the remote side of the protocol on a plain
//! thread, executing the module with wasmtime.
//!
//! Imports are linked to functions that forward the call to the client as a
//! `CallHost` response and block until the client answers with `CallResult`.

use std::thread::JoinHandle;

use wasmtime::Engine;
use wasmtime::ExternType;
use wasmtime::Instance;
use wasmtime::Linker;
use wasmtime::Module;
use wasmtime::Store;
use wasmtime::Val;
use wasmtime::ValType;

use tetherpc::BinaryResponse;
use tetherpc::BinaryResponseKind;
use tetherpc::CallHostResponse;
use tetherpc::CallResultResponse;
use tetherpc::InitResponse;
use tetherpc::LoadMemoryResponse;
use tetherpc::Number;
use tetherpc::StoreMemoryResponse;
use tetherpc::TextRequest;
use tetherpc::VersionResponse;
use tetherpc::WasmExport;
use tetherpc::WasmValue;
use tetherun::mock_transport::Incoming;
use tetherun::mock_transport::ServerEnd;

pub const VERSION: &str = "loopback-0.1";

/// Serves the connection until the client closes it.
pub fn spawn(server: ServerEnd) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("loopback-debugger".into())
        .spawn(move || serve(server))
        .expect("failed to spawn loopback debugger")
}

fn serve(mut server: ServerEnd) {
    let bytes = loop {
        match server.next_request() {
            Some(Incoming::Binary(bytes)) => break bytes,
            Some(Incoming::Text(TextRequest::Version)) => {
                server.reply(VersionResponse { value: VERSION.into() });
            }
            Some(other) => panic!("request before the module was loaded: {:?}", other),
            None => return,
        }
    };

    let engine = Engine::default();
    let module = Module::new(&engine, &bytes).expect("module should compile");
    let mut store = Store::new(&engine, server);
    let instance = link(&module, &mut store);

    let exports = describe(&module, &instance, &mut store);
    let initial_memory = instance
        .get_memory(&mut store, "memory")
        .map(|memory| memory.data(&store).to_vec())
        .unwrap_or_default();
    store.data().reply(InitResponse { exports });

    while let Some(request) = store.data_mut().next_request() {
        match request {
            Incoming::Text(TextRequest::Version) => {
                store.data().reply(VersionResponse { value: VERSION.into() });
            }
            Incoming::Text(TextRequest::InitMemory) => {
                let response = BinaryResponse::new(BinaryResponseKind::InitMemory, initial_memory.clone());
                store.data().send(response.into_frame());
            }
            Incoming::Text(TextRequest::CallExported { name, args }) => {
                let values = call(&instance, &mut store, &name, &args);
                store.data().reply(CallResultResponse { values });
            }
            Incoming::Text(TextRequest::LoadMemory { name, offset, length }) => {
                let memory = instance.get_memory(&mut store, &name).expect("memory export");
                let mut bytes = vec![0; length as usize];
                memory
                    .read(&store, offset as usize, &mut bytes)
                    .expect("load within bounds");
                store.data().reply(LoadMemoryResponse { bytes });
            }
            Incoming::Text(TextRequest::StoreMemory { name, offset, bytes }) => {
                let memory = instance.get_memory(&mut store, &name).expect("memory export");
                memory
                    .write(&mut store, offset as usize, &bytes)
                    .expect("store within bounds");
                store.data().reply(StoreMemoryResponse {});
            }
            other => panic!("unexpected request outside of a call: {:?}", other),
        }
    }
}

fn link(module: &Module, store: &mut Store<ServerEnd>) -> Instance {
    let mut linker = Linker::<ServerEnd>::new(store.engine());

    for import in module.imports() {
        let ExternType::Func(ty) = import.ty() else {
            panic!("only function imports are supported: {}.{}", import.module(), import.name());
        };
        let module_name = import.module().to_string();
        let field = import.name().to_string();
        let result_types: Vec<ValType> = ty.results().collect();

        linker
            .func_new(import.module(), import.name(), ty, move |mut caller, params, results| {
                let args = params.iter().map(to_wasm_value).collect::<wasmtime::Result<Vec<_>>>()?;
                caller.data().reply(CallHostResponse {
                    module: module_name.clone(),
                    field: field.clone(),
                    args,
                });

                let values = match caller.data_mut().next_request() {
                    Some(Incoming::Text(TextRequest::CallResult { values })) => values,
                    other => {
                        return Err(wasmtime::Error::msg(format!("expected CallResult, got {:?}", other)));
                    }
                };

                for ((slot, ty), value) in results.iter_mut().zip(&result_types).zip(values) {
                    let value = value.ok_or_else(|| wasmtime::Error::msg("host returned no value"))?;
                    *slot = to_val(value, ty)?;
                }
                Ok(())
            })
            .expect("import should link");
    }

    linker.instantiate(&mut *store, module).expect("module should instantiate")
}

fn describe(module: &Module, instance: &Instance, store: &mut Store<ServerEnd>) -> Vec<WasmExport> {
    module
        .exports()
        .map(|export| {
            let name = export.name().to_string();
            match export.ty() {
                ExternType::Func(_) => WasmExport::function(name),
                ExternType::Memory(_) => {
                    let memory = instance.get_memory(&mut *store, &name).expect("memory export");
                    let size = memory.data_size(&*store) as u64;
                    WasmExport::memory(name, size)
                }
                ExternType::Global(_) => WasmExport {
                    name,
                    kind: tetherpc::ExportKind::Global,
                },
                _ => WasmExport {
                    name,
                    kind: tetherpc::ExportKind::Table,
                },
            }
        })
        .collect()
}

fn call(instance: &Instance, store: &mut Store<ServerEnd>, name: &str, args: &[Number]) -> Vec<WasmValue> {
    let func = instance.get_func(&mut *store, name).expect("function export");
    let ty = func.ty(&*store);

    let params = args
        .iter()
        .zip(ty.params())
        .map(|(arg, ty)| to_val(*arg, &ty))
        .collect::<wasmtime::Result<Vec<_>>>()
        .expect("arguments should match the signature");
    let mut results = vec![Val::I32(0); ty.results().len()];

    func.call(&mut *store, &params, &mut results).expect("call should succeed");
    results
        .iter()
        .map(to_wasm_value)
        .collect::<wasmtime::Result<Vec<_>>>()
        .expect("results should be numeric")
}

fn to_val(number: Number, ty: &ValType) -> wasmtime::Result<Val> {
    match ty {
        ValType::I32 => Ok(Val::I32(number.as_i64() as i32)),
        ValType::I64 => Ok(Val::I64(number.as_i64())),
        ValType::F32 => Ok(Val::F32((number.as_f64() as f32).to_bits())),
        ValType::F64 => Ok(Val::F64(number.as_f64().to_bits())),
        other => Err(wasmtime::Error::msg(format!("unsupported value type {:?}", other))),
    }
}

fn to_wasm_value(val: &Val) -> wasmtime::Result<WasmValue> {
    match val {
        Val::I32(v) => Ok(WasmValue::I32(*v)),
        Val::I64(v) => Ok(WasmValue::I64(*v)),
        Val::F32(bits) => Ok(WasmValue::F32(f32::from_bits(*bits))),
        Val::F64(bits) => Ok(WasmValue::F64(f64::from_bits(*bits))),
        other => Err(wasmtime::Error::msg(format!("unsupported value {:?}", other))),
    }
}
