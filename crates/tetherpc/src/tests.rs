use crate::*;
use serde_json::json;

// ============================================================================
//  WIRE SHAPES
// ============================================================================

fn text_of(frame: SocketFrame) -> String {
    match frame {
        SocketFrame::Text(text) => text,
        SocketFrame::Binary(_) => panic!("expected a text frame"),
    }
}

fn as_json(frame: SocketFrame) -> serde_json::Value {
    serde_json::from_str(&text_of(frame)).unwrap()
}

#[test]
fn test_call_exported_request_shape() {
    let request = TextRequest::CallExported {
        name: "add".into(),
        args: vec![Number::Int(1), Number::Float(2.5)],
    };

    let value = as_json(encode_request(&request).unwrap());
    assert_eq!(value, json!({"type": "CallExported", "name": "add", "args": [1, 2.5]}));
}

#[test]
fn test_unit_requests_carry_only_their_tag() {
    assert_eq!(as_json(encode_request(&TextRequest::Version).unwrap()), json!({"type": "Version"}));
    assert_eq!(as_json(encode_request(&TextRequest::InitMemory).unwrap()), json!({"type": "InitMemory"}));
}

#[test]
fn test_call_result_request_encodes_absent_value_as_null() {
    let request = TextRequest::CallResult { values: vec![None] };
    let value = as_json(encode_request(&request).unwrap());
    assert_eq!(value, json!({"type": "CallResult", "values": [null]}));

    let request = TextRequest::CallResult { values: vec![Some(Number::Int(7))] };
    let value = as_json(encode_request(&request).unwrap());
    assert_eq!(value, json!({"type": "CallResult", "values": [7]}));
}

#[test]
fn test_memory_requests_shape() {
    let load = TextRequest::LoadMemory { name: "memory".into(), offset: 16, length: 4 };
    assert_eq!(
        as_json(encode_request(&load).unwrap()),
        json!({"type": "LoadMemory", "name": "memory", "offset": 16, "length": 4})
    );

    let store = TextRequest::StoreMemory { name: "memory".into(), offset: 0, bytes: vec![0xff, 0] };
    assert_eq!(
        as_json(encode_request(&store).unwrap()),
        json!({"type": "StoreMemory", "name": "memory", "offset": 0, "bytes": [255, 0]})
    );
}

#[test]
fn test_decode_request_round_trips_server_side() {
    let text = r#"{"type":"LoadMemory","name":"mem","offset":3,"length":9}"#;
    let request = decode_request(text).unwrap();
    assert_eq!(request, TextRequest::LoadMemory { name: "mem".into(), offset: 3, length: 9 });
}

// ============================================================================
//  RESPONSES
// ============================================================================

#[test]
fn test_decode_init_with_mixed_exports() {
    let text = r#"{
        "type": "Init",
        "exports": [
            {"type": "Function", "name": "ret_42"},
            {"type": "Memory", "name": "memory", "memorySize": 65536},
            {"type": "Global", "name": "g"},
            {"type": "Table", "name": "t"}
        ]
    }"#;

    let response = decode_response(text).unwrap();
    assert_eq!(response.kind(), TextResponseKind::Init);

    let init = InitResponse::select(response).unwrap();
    assert_eq!(init.exports.len(), 4);
    assert_eq!(init.exports[0], WasmExport::function("ret_42"));
    assert_eq!(init.exports[1], WasmExport::memory("memory", 65536));
    assert_eq!(init.exports[2].kind, ExportKind::Global);
    assert_eq!(init.exports[3].kind, ExportKind::Table);
}

#[test]
fn test_decode_call_result_values_keep_their_kind() {
    let text = r#"{"type":"CallResult","values":[{"type":"I32","value":42},{"type":"F64","value":0.5}]}"#;
    let result = CallResultResponse::select(decode_response(text).unwrap()).unwrap();
    assert_eq!(result.values, vec![WasmValue::I32(42), WasmValue::F64(0.5)]);
    assert_eq!(result.values[0].kind(), ValueKind::I32);
    assert_eq!(result.values[1].as_i32(), None);
}

#[test]
fn test_decode_call_host() {
    let text = r#"{"type":"CallHost","module":"js_env","field":"print","args":[{"type":"I32","value":4}]}"#;
    let call = CallHostResponse::select(decode_response(text).unwrap()).unwrap();
    assert_eq!(call.module, "js_env");
    assert_eq!(call.field, "print");
    assert_eq!(call.args, vec![WasmValue::I32(4)]);
}

#[test]
fn test_store_memory_result_has_no_body() {
    let frame = encode_response(&StoreMemoryResponse {}.into()).unwrap();
    assert_eq!(as_json(frame), json!({"type": "StoreMemoryResult"}));

    let response = decode_response(r#"{"type":"StoreMemoryResult"}"#).unwrap();
    assert_eq!(response.kind(), TextResponseKind::StoreMemoryResult);
}

#[test]
fn test_select_hands_back_mismatched_response() {
    let response: TextResponse = LoadMemoryResponse { bytes: vec![1, 2, 3] }.into();
    let back = StoreMemoryResponse::select(response).unwrap_err();
    assert_eq!(back.kind(), TextResponseKind::LoadMemoryResult);
}

#[test]
fn test_unknown_response_tag_is_an_error() {
    let err = decode_response(r#"{"type":"Nope"}"#).unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

#[test]
fn test_i64_survives_json_without_precision_loss() {
    let big = i64::MAX - 1;
    let text = serde_json::to_string(&TextResponse::CallResult(CallResultResponse {
        values: vec![WasmValue::I64(big)],
    }))
    .unwrap();
    let result = CallResultResponse::select(decode_response(&text).unwrap()).unwrap();
    assert_eq!(result.values[0].as_i64(), Some(big));

    let request = TextRequest::CallExported { name: "f".into(), args: vec![WasmValue::I64(big).to_number()] };
    let decoded = decode_request(&text_of(encode_request(&request).unwrap())).unwrap();
    assert_eq!(decoded, request);
}

// ============================================================================
//  REQUEST / RESPONSE PAIRING
// ============================================================================

#[test]
fn test_every_request_expects_one_response_kind() {
    let cases = [
        (TextRequest::Version, ResponseKind::Text(TextResponseKind::Version)),
        (TextRequest::InitMemory, ResponseKind::Binary(BinaryResponseKind::InitMemory)),
        (
            TextRequest::CallExported { name: "f".into(), args: vec![] },
            ResponseKind::Text(TextResponseKind::CallResult),
        ),
        (
            TextRequest::LoadMemory { name: "m".into(), offset: 0, length: 1 },
            ResponseKind::Text(TextResponseKind::LoadMemoryResult),
        ),
        (
            TextRequest::StoreMemory { name: "m".into(), offset: 0, bytes: vec![] },
            ResponseKind::Text(TextResponseKind::StoreMemoryResult),
        ),
    ];

    for (request, expected) in cases {
        assert_eq!(request.expected_response(), expected, "{:?}", request);
    }
}

// ============================================================================
//  BINARY FRAMES
// ============================================================================

#[test]
fn test_binary_response_splits_discriminant() {
    let response = BinaryResponse::decode(&[0, 0xde, 0xad]).unwrap();
    assert_eq!(response.kind, BinaryResponseKind::InitMemory);
    assert_eq!(response.bytes, vec![0xde, 0xad]);
    assert_eq!(response.encode(), vec![0, 0xde, 0xad]);
}

#[test]
fn test_binary_response_rejects_bad_frames() {
    assert!(matches!(BinaryResponse::decode(&[]), Err(Error::EmptyBinaryFrame)));
    assert!(matches!(BinaryResponse::decode(&[9, 1]), Err(Error::UnknownBinaryKind(9))));
}

#[test]
fn test_binary_frame_debug_hides_body() {
    let frame = SocketFrame::Binary(vec![0; 1024]);
    assert_eq!(format!("{:?}", frame), "Binary(1024 bytes)");
    assert_eq!(frame.kind(), FrameKind::Binary);
    assert_eq!(frame.len(), 1024);
}
