//! Benchmarks for signature parsing.
//!
//! Covers the signature shapes found in Win32 metadata:
//! - Native function imports (pointers, handles, out parameters)
//! - COM interface methods (instance, `HRESULT` returns, pointer-to-pointer)
//! - Field signatures (primitives, value types, fixed arrays, function pointers)
//! - Type specifications

extern crate dotinterop;

use criterion::{criterion_group, criterion_main, Criterion};
use dotinterop::metadata::signatures::{
    parse_field_signature, parse_method_signature, parse_type_spec_signature,
};
use std::hint::black_box;

/// Signature: void MessageBeep()
fn bench_import_void(c: &mut Criterion) {
    // DEFAULT, 0 params, VOID return
    let signature = [0x00, 0x00, 0x01];

    c.bench_function("sig_import_void", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Signature: BOOL CloseHandle(HANDLE hObject)
fn bench_import_handle(c: &mut Criterion) {
    // DEFAULT, 1 param, VALUETYPE BOOL return, VALUETYPE HANDLE param
    let signature = [0x00, 0x01, 0x11, 0x09, 0x11, 0x0D];

    c.bench_function("sig_import_handle", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Signature: int MessageBoxW(HWND hWnd, PCWSTR lpText, PCWSTR lpCaption, MESSAGEBOX_STYLE uType)
fn bench_import_message_box(c: &mut Criterion) {
    // DEFAULT, 4 params, I4 return, four VALUETYPE params
    let signature = [
        0x00, 0x04, 0x08, 0x11, 0x11, 0x11, 0x15, 0x11, 0x15, 0x11, 0x19,
    ];

    c.bench_function("sig_import_message_box", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Signature: BOOL GetExitCodeProcess(HANDLE hProcess, uint* lpExitCode)
fn bench_import_out_pointer(c: &mut Criterion) {
    // DEFAULT, 2 params, VALUETYPE BOOL return, VALUETYPE HANDLE, PTR U4
    let signature = [0x00, 0x02, 0x11, 0x09, 0x11, 0x0D, 0x0F, 0x09];

    c.bench_function("sig_import_out_pointer", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Signature: HRESULT IShellItem.GetParent(IShellItem** ppsi)
fn bench_com_pointer_pointer(c: &mut Criterion) {
    // HASTHIS, 1 param, VALUETYPE HRESULT return, PTR PTR CLASS IShellItem
    let signature = [0x20, 0x01, 0x11, 0x1D, 0x0F, 0x0F, 0x12, 0x21];

    c.bench_function("sig_com_pointer_pointer", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Signature: HRESULT IShellItem.Compare(IShellItem psi, uint hint, int* piOrder)
fn bench_com_compare(c: &mut Criterion) {
    // HASTHIS, 3 params, VALUETYPE HRESULT return, CLASS, U4, PTR I4
    let signature = [0x20, 0x03, 0x11, 0x1D, 0x12, 0x21, 0x09, 0x0F, 0x08];

    c.bench_function("sig_com_compare", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Signature: void* CoTaskMemAlloc(nuint cb) with a `const` modifier on the return
fn bench_import_custom_modifier(c: &mut Criterion) {
    // DEFAULT, 1 param, CMOD_OPT IsConst PTR VOID return, U param
    let signature = [0x00, 0x01, 0x20, 0x25, 0x0F, 0x01, 0x19];

    c.bench_function("sig_import_custom_modifier", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Signature: int wsprintfW(PWSTR, PCWSTR, ...)
fn bench_import_varargs(c: &mut Criterion) {
    // VARARG, 3 params, I4 return, VALUETYPE, VALUETYPE, SENTINEL I4
    let signature = [0x05, 0x03, 0x08, 0x11, 0x29, 0x11, 0x15, 0x41, 0x08];

    c.bench_function("sig_import_varargs", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Field signature: uint
fn bench_field_primitive(c: &mut Criterion) {
    let signature = [0x06, 0x09];

    c.bench_function("sig_field_primitive", |b| {
        b.iter(|| {
            let sig = parse_field_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Field signature: RECT rcWork
fn bench_field_value_type(c: &mut Criterion) {
    let signature = [0x06, 0x11, 0x2D];

    c.bench_function("sig_field_value_type", |b| {
        b.iter(|| {
            let sig = parse_field_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Field signature: char szExeFile[260]
fn bench_field_fixed_array(c: &mut Criterion) {
    // FIELD, ARRAY CHAR, rank 1, 1 size 260, 0 lower bounds
    let signature = [0x06, 0x14, 0x03, 0x01, 0x01, 0x81, 0x04, 0x00];

    c.bench_function("sig_field_fixed_array", |b| {
        b.iter(|| {
            let sig = parse_field_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Field signature: a vtable slot `delegate* unmanaged<void*, uint>`
fn bench_field_function_pointer(c: &mut Criterion) {
    // FIELD, FNPTR (DEFAULT, 1 param, U4 return, PTR VOID param)
    let signature = [0x06, 0x1B, 0x00, 0x01, 0x09, 0x0F, 0x01];

    c.bench_function("sig_field_function_pointer", |b| {
        b.iter(|| {
            let sig = parse_field_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Type specification: a triple pointer to a value type
fn bench_type_spec_nested_pointer(c: &mut Criterion) {
    let signature = [0x0F, 0x0F, 0x0F, 0x11, 0x31];

    c.bench_function("sig_type_spec_nested_pointer", |b| {
        b.iter(|| {
            let sig = parse_type_spec_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Type specification: single dimension array of pointers
fn bench_type_spec_szarray(c: &mut Criterion) {
    let signature = [0x1D, 0x0F, 0x11, 0x31];

    c.bench_function("sig_type_spec_szarray", |b| {
        b.iter(|| {
            let sig = parse_type_spec_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

criterion_group!(
    benches,
    bench_import_void,
    bench_import_handle,
    bench_import_message_box,
    bench_import_out_pointer,
    bench_com_pointer_pointer,
    bench_com_compare,
    bench_import_custom_modifier,
    bench_import_varargs,
    bench_field_primitive,
    bench_field_value_type,
    bench_field_fixed_array,
    bench_field_function_pointer,
    bench_type_spec_nested_pointer,
    bench_type_spec_szarray,
);
criterion_main!(benches);
