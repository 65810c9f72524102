use super::*;
use crate::{
    config::{Generation, Unified},
    metadata::catalog::{ImportFlags, ImportInfo, ParamAttributes},
    naming::NameArbiter,
    typegraph::{Method, Parameter, QualifiedName, TypeNode},
};

const FOUNDATION: &str = "Windows.Win32.Foundation";
const SHELL: &str = "Windows.Win32.UI.Shell";

fn emit_with(graph: &TypeGraph, arbiter: &NameArbiter, id: TypeId) -> Unit {
    let generation = Generation::default();
    let context = EmitContext {
        graph,
        generation: &generation,
        arbiter,
    };
    CSharpEmitter::new().emit(&context, id).unwrap()
}

fn emit(graph: &TypeGraph, id: TypeId) -> Unit {
    emit_with(graph, &NameArbiter::new(None, "cs"), id)
}

fn builtin(graph: &TypeGraph, full_name: &str) -> TypeId {
    graph.find_full_name(full_name).unwrap()
}

fn structure(namespace: &str, name: &str, layout: LayoutKind) -> TypeNode {
    TypeNode::new(
        QualifiedName::new(namespace, name),
        TypeKind::Structure {
            layout,
            packing_size: None,
            class_size: None,
        },
    )
}

fn hresult(graph: &mut TypeGraph) -> TypeId {
    let int = builtin(graph, wellknown::INT32);
    let mut node = structure(FOUNDATION, "HRESULT", LayoutKind::Sequential);
    node.fields.push(Field::new(None, "Value", int));
    graph.insert(node)
}

fn hwnd(graph: &mut TypeGraph) -> TypeId {
    let intptr = builtin(graph, wellknown::INTPTR);
    let mut node = structure(FOUNDATION, "HWND", LayoutKind::Sequential);
    node.is_handle = true;
    node.fields.push(Field::new(None, "Value", intptr));
    graph.insert(node)
}

fn constant(name: &str, type_id: TypeId, bytes: &[u8]) -> Field {
    let mut field = Field::new(None, name, type_id);
    field.attributes = FieldAttributes::PUBLIC | FieldAttributes::STATIC | FieldAttributes::LITERAL;
    field.default_value = Some(bytes.to_vec());
    field
}

#[test]
fn flags_enum() {
    let mut graph = TypeGraph::with_well_known();
    let uint = builtin(&graph, wellknown::UINT32);
    let id = graph.insert(TypeNode::new(
        QualifiedName::new(SHELL, "SIATTRIBFLAGS"),
        TypeKind::Enum {
            is_flags: true,
            underlying: Some(uint),
        },
    ));
    graph[id].fields = vec![
        constant("SIATTRIBFLAGS_AND", id, &1u32.to_le_bytes()),
        constant("SIATTRIBFLAGS_OR", id, &2u32.to_le_bytes()),
    ];

    let unit = emit(&graph, id);
    assert_eq!(
        unit.path,
        std::path::PathBuf::from("Windows/Win32/UI/Shell/SIATTRIBFLAGS.cs")
    );
    assert_eq!(
        unit.text,
        "#nullable enable\n\
         namespace Windows.Win32.UI.Shell;\n\
         \n\
         [Flags]\n\
         public enum SIATTRIBFLAGS : uint\n\
         {\n    \
             SIATTRIBFLAGS_AND = 1,\n    \
             SIATTRIBFLAGS_OR = 2,\n\
         }\n"
    );
}

#[test]
fn sequential_structure() {
    let mut graph = TypeGraph::with_well_known();
    let int = builtin(&graph, wellknown::INT32);
    let mut node = structure(FOUNDATION, "RECT", LayoutKind::Sequential);
    node.documentation =
        Some("https://learn.microsoft.com/windows/win32/api/windef/ns-windef-rect".into());
    node.fields = vec![Field::new(None, "left", int), Field::new(None, "top", int)];
    let id = graph.insert(node);

    assert_eq!(
        emit(&graph, id).text,
        "#nullable enable\n\
         namespace Windows.Win32.Foundation;\n\
         \n\
         // https://learn.microsoft.com/windows/win32/api/windef/ns-windef-rect\n\
         public partial struct RECT\n\
         {\n    \
             public int left;\n    \
             public int top;\n\
         }\n"
    );
}

#[test]
fn explicit_structure_with_nested_type() {
    let mut graph = TypeGraph::with_well_known();
    let uint = builtin(&graph, wellknown::UINT32);
    let int = builtin(&graph, wellknown::INT32);
    let long = builtin(&graph, wellknown::INT64);

    let mut nested = structure(FOUNDATION, "LARGE_INTEGER+_u_e__Struct", LayoutKind::Sequential);
    nested.is_nested = true;
    nested.fields = vec![
        Field::new(None, "LowPart", uint),
        Field::new(None, "HighPart", int),
    ];
    let nested = graph.insert(nested);

    let mut node = structure(FOUNDATION, "LARGE_INTEGER", LayoutKind::Explicit);
    node.nested_types.push(nested);
    let mut u = Field::new(None, "u", nested);
    u.offset = Some(0);
    let mut quad = Field::new(None, "QuadPart", long);
    quad.offset = Some(0);
    node.fields = vec![u, quad];
    let id = graph.insert(node);

    assert_eq!(
        emit(&graph, id).text,
        "#nullable enable\n\
         namespace Windows.Win32.Foundation;\n\
         \n\
         [StructLayout(LayoutKind.Explicit)]\n\
         public partial struct LARGE_INTEGER\n\
         {\n    \
             public struct _u_e__Struct\n    \
             {\n        \
                 public uint LowPart;\n        \
                 public int HighPart;\n    \
             }\n\
         \n    \
             [FieldOffset(0)]\n    \
             public _u_e__Struct u;\n\
         \n    \
             [FieldOffset(0)]\n    \
             public long QuadPart;\n\
         }\n"
    );
}

#[test]
fn packed_structure_with_marshalled_field() {
    let mut graph = TypeGraph::with_well_known();
    let boolean = builtin(&graph, wellknown::BOOLEAN);
    let byte = builtin(&graph, wellknown::BYTE);
    let mut node = structure(SHELL, "SHITEMID", LayoutKind::Sequential);
    node.kind = TypeKind::Structure {
        layout: LayoutKind::Sequential,
        packing_size: Some(1),
        class_size: None,
    };
    let mut data = Field::new(None, "abID", byte);
    data.is_flexible_array = true;
    node.fields = vec![Field::new(None, "fEnabled", boolean), data];
    let id = graph.insert(node);

    let text = emit(&graph, id).text;
    assert!(text.contains("[StructLayout(LayoutKind.Sequential, Pack = 1)]\npublic partial struct SHITEMID\n"));
    assert!(text.contains("    [MarshalAs(UnmanagedType.U4)]\n    public bool fEnabled;\n"));
    assert!(text.contains("    public byte abID; // variable-length array placeholder\n"));
}

#[test]
fn handle_structure() {
    let mut graph = TypeGraph::with_well_known();
    let id = hwnd(&mut graph);

    let text = emit(&graph, id).text;
    assert!(text.contains("public partial struct HWND : IEquatable<HWND>\n{\n"));
    assert!(text.contains("    public static readonly HWND Null = new();\n\n    public nint Value;\n"));
    assert!(text.contains("    public HWND(nint value) => this.Value = value;\n"));
    assert!(text.contains("    public override string ToString() => $\"0x{Value:x}\";\n"));
    assert!(text.contains("    public readonly bool Equals(HWND other) => other.Value == Value;\n"));
    assert!(text.contains("    public static bool operator !=(HWND left, HWND right) => !left.Equals(right);\n"));
    assert!(text.contains("    public static implicit operator nint(HWND value) => value.Value;\n"));
    assert!(text.contains("    public static implicit operator HWND(nint value) => new(value);\n"));
    assert!(text.ends_with("}\n"));
}

#[test]
fn com_interface() {
    let mut graph = TypeGraph::with_well_known();
    let hresult = hresult(&mut graph);
    let uint = builtin(&graph, wellknown::UINT32);
    let int = builtin(&graph, wellknown::INT32);
    let int_ptr = graph.pointer_to(int, 1);

    let mut node = TypeNode::new(
        QualifiedName::new(SHELL, "IShellItem"),
        TypeKind::Interface {
            is_iunknown_derived: true,
        },
    );
    node.guid = Some(uguid::guid!("43826d1e-e718-42ee-bc55-a1e261c37bfe"));
    let id = graph.insert(node);

    let mut compare = Method::new(None, "Compare");
    compare.return_type = Some(hresult);
    let mut psi = Parameter::new("psi", 1, id);
    psi.attributes = ParamAttributes::IN;
    let mut hint = Parameter::new("hint", 2, uint);
    hint.attributes = ParamAttributes::IN;
    let mut order = Parameter::new("piOrder", 3, int_ptr);
    order.attributes = ParamAttributes::OUT;
    compare.parameters = vec![psi, hint, order];
    graph[id].methods.push(compare);

    let text = emit(&graph, id).text;
    assert!(text.contains(
        "[GeneratedComInterface, Guid(\"43826d1e-e718-42ee-bc55-a1e261c37bfe\")]\n\
         public partial interface IShellItem\n\
         {\n    \
             [PreserveSig]\n    \
             [return: MarshalAs(UnmanagedType.Error)]\n    \
             Windows.Win32.Foundation.HRESULT Compare(IShellItem psi, uint hint, out int piOrder);\n\
         }\n"
    ));
}

#[test]
fn derived_com_interface_lists_base() {
    let mut graph = TypeGraph::with_well_known();
    let kind = TypeKind::Interface {
        is_iunknown_derived: true,
    };
    let base = graph.insert(TypeNode::new(
        QualifiedName::new(wellknown::COM_NAMESPACE, "IPersist"),
        kind.clone(),
    ));
    let mut node = TypeNode::new(QualifiedName::new(SHELL, "IPersistFolder"), kind);
    node.interfaces.push(base);
    let id = graph.insert(node);

    let text = emit(&graph, id).text;
    assert!(text.contains("[GeneratedComInterface, Guid(\"00000000-0000-0000-0000-000000000000\")]\n"));
    assert!(text.contains("public partial interface IPersistFolder : Windows.Win32.System.Com.IPersist\n{\n}\n"));
}

#[test]
fn dispatch_table_structure() {
    let mut graph = TypeGraph::with_well_known();
    let hresult = hresult(&mut graph);
    let uint = builtin(&graph, wellknown::UINT32);
    let int = builtin(&graph, wellknown::INT32);
    let int_ptr = graph.pointer_to(int, 1);

    let id = graph.insert(TypeNode::new(
        QualifiedName::new("Windows.Win32.Graphics.Direct3D12", "ID3D12ConstantBuffer"),
        TypeKind::Interface {
            is_iunknown_derived: false,
        },
    ));
    let mut get_desc = Method::new(None, "GetDesc");
    get_desc.return_type = Some(hresult);
    let mut desc = Parameter::new("pDesc", 1, int_ptr);
    desc.attributes = ParamAttributes::OUT;
    get_desc.parameters.push(desc);
    let mut get_count = Method::new(None, "GetCount");
    get_count.return_type = Some(uint);
    graph[id].methods = vec![get_desc, get_count];

    let text = emit(&graph, id).text;
    assert_eq!(
        text,
        "#nullable enable\n\
         namespace Windows.Win32.Graphics.Direct3D12;\n\
         \n\
         public partial struct ID3D12ConstantBuffer\n\
         {\n    \
             public static readonly ID3D12ConstantBuffer Null = new();\n\
         \n    \
             public nint VTablePtr;\n\
         \n    \
             [return: MarshalAs(UnmanagedType.Error)]\n    \
             public unsafe Windows.Win32.Foundation.HRESULT GetDesc(ref int pDesc) =>\n        \
                 ((delegate* unmanaged<ID3D12ConstantBuffer*,int*, Windows.Win32.Foundation.HRESULT>)(((void**)*((void**)VTablePtr))[0]))((ID3D12ConstantBuffer*)VTablePtr, (int*)Unsafe.AsPointer(ref pDesc));\n\
         \n    \
             public unsafe uint GetCount() =>\n        \
                 ((delegate* unmanaged<ID3D12ConstantBuffer*, uint>)(((void**)*((void**)VTablePtr))[1]))((ID3D12ConstantBuffer*)VTablePtr);\n\
         }\n"
    );
}

#[test]
fn dispatch_table_headers_per_owner() {
    let mut graph = TypeGraph::with_well_known();
    let uint = builtin(&graph, wellknown::UINT32);
    let kind = TypeKind::Interface {
        is_iunknown_derived: false,
    };
    let mut count = Method::new(None, "GetCount");
    count.return_type = Some(uint);

    let mut base = TypeNode::new(QualifiedName::new(SHELL, "IBase"), kind.clone());
    base.methods.push(count);
    let base = graph.insert(base);
    let mut node = TypeNode::new(QualifiedName::new(SHELL, "IDerived"), kind);
    node.interfaces.push(base);
    node.methods.push(Method::new(None, "Reset"));
    let id = graph.insert(node);

    let text = emit(&graph, id).text;
    let base_header = text.find("    // IBase methods\n").unwrap();
    let derived_header = text.find("    // IDerived methods\n").unwrap();
    assert!(base_header < derived_header);
    assert!(text.contains("[0]))((IDerived*)VTablePtr);\n\n    // IDerived methods\n"));
    assert!(text.contains("    public unsafe void Reset() =>\n"));
    assert!(text.contains("<IDerived*, void>)(((void**)*((void**)VTablePtr))[1]))"));
}

#[test]
fn api_holder() {
    let mut graph = TypeGraph::with_well_known();
    let uint = builtin(&graph, wellknown::UINT32);
    let guid = builtin(&graph, wellknown::GUID);
    let bool_id = graph.insert(structure(FOUNDATION, "BOOL", LayoutKind::Sequential));
    let hwnd = hwnd(&mut graph);

    let mut node = TypeNode::new(QualifiedName::new(FOUNDATION, "Apis"), TypeKind::ApiHolder);
    let clsid = uguid::guid!("9ac9fbe1-e0a2-4ad6-b4ee-e212013ea917");
    let mut shell = Field::new(None, "CLSID_ShellItem", guid);
    shell.attributes = FieldAttributes::PUBLIC | FieldAttributes::STATIC;
    shell.default_value = Some(clsid.to_bytes().to_vec());
    let mut missing = Field::new(None, "NO_VALUE", uint);
    missing.attributes = FieldAttributes::PUBLIC | FieldAttributes::STATIC | FieldAttributes::LITERAL;
    node.fields = vec![
        constant("INFINITE", uint, &u32::MAX.to_le_bytes()),
        missing,
        shell,
    ];

    let mut tick = Method::new(None, "GetTickCount");
    tick.attributes = MethodAttributes::STATIC;
    tick.return_type = Some(uint);
    tick.import = Some(ImportInfo {
        flags: ImportFlags::empty(),
        entry_point: "GetTickCount".into(),
        module: "KERNEL32.dll".into(),
    });

    let mut is_window = Method::new(None, "IsWindow");
    is_window.attributes = MethodAttributes::STATIC;
    is_window.is_unicode = true;
    is_window.supported_os_platform = Some("windows5.0".into());
    is_window.return_type = Some(bool_id);
    is_window.parameters.push(Parameter::new("hWnd", 1, hwnd));
    is_window.import = Some(ImportInfo {
        flags: ImportFlags::empty(),
        entry_point: "IsWindow".into(),
        module: "USER32.dll".into(),
    });
    node.methods = vec![tick, is_window];
    let id = graph.insert(node);

    assert_eq!(
        emit(&graph, id).text,
        "#nullable enable\n\
         namespace Windows.Win32.Foundation;\n\
         \n\
         public static partial class Apis\n\
         {\n    \
             public const uint INFINITE = uint.MaxValue;\n\
         \n    \
             public static readonly Guid CLSID_ShellItem = new(\"9ac9fbe1-e0a2-4ad6-b4ee-e212013ea917\");\n\
         \n    \
             [LibraryImport(\"KERNEL32\")]\n    \
             [PreserveSig]\n    \
             public static partial uint GetTickCount();\n\
         \n    \
             [LibraryImport(\"USER32\", StringMarshalling = StringMarshalling.Utf16, SetLastError = true)]\n    \
             [SupportedOSPlatform(\"windows5.0\")]\n    \
             [PreserveSig]\n    \
             [return: MarshalAs(UnmanagedType.U4)]\n    \
             public static partial bool IsWindow(HWND hWnd);\n\
         }\n"
    );
}

#[test]
fn import_calling_convention() {
    let mut graph = TypeGraph::with_well_known();
    let mut node = TypeNode::new(QualifiedName::new(FOUNDATION, "Apis"), TypeKind::ApiHolder);
    let mut method = Method::new(None, "wsprintfW");
    method.attributes = MethodAttributes::STATIC;
    method.import = Some(ImportInfo {
        flags: ImportFlags::CALL_CONV_MID,
        entry_point: "wsprintfW".into(),
        module: "USER32.dll".into(),
    });
    node.methods.push(method);
    let id = graph.insert(node);

    let text = emit(&graph, id).text;
    assert!(text.contains(
        "    [PreserveSig]\n    \
         [UnmanagedCallConv(CallConvs = [typeof(CallConvCdecl)])]\n    \
         public static partial void wsprintfW();\n"
    ));
}

#[test]
fn unified_constants_use_simple_names() {
    let mut graph = TypeGraph::with_well_known();
    let uint = builtin(&graph, wellknown::UINT32);
    let color = graph.insert(TypeNode::new(
        QualifiedName::new(SHELL, "COLOR"),
        TypeKind::Enum {
            is_flags: false,
            underlying: Some(uint),
        },
    ));

    let mut node = TypeNode::new(QualifiedName::new("DirectN", "Constants"), TypeKind::ApiHolder);
    let mut patched = Field::new(None, "MAX_PATH", uint);
    patched.attributes = FieldAttributes::PUBLIC | FieldAttributes::STATIC | FieldAttributes::LITERAL;
    patched.type_name = Some("int".into());
    patched.value = Some("260".into());
    node.fields = vec![
        constant("COLOR_RED", color, &4u32.to_le_bytes()),
        patched,
    ];
    let id = graph.insert(node);

    let arbiter = NameArbiter::new(
        Some(Unified {
            namespace: "DirectN".into(),
            functions_file_name: Some("Functions".into()),
            constants_file_name: Some("Constants".into()),
        }),
        "cs",
    );
    let unit = emit_with(&graph, &arbiter, id);
    assert_eq!(unit.path, std::path::PathBuf::from("DirectN/Constants.cs"));
    assert!(unit.text.contains("namespace DirectN;\n"));
    assert!(unit.text.contains("    public const COLOR COLOR_RED = (COLOR)4;\n"));
    assert!(unit.text.contains("    public const int MAX_PATH = 260;\n"));
}

#[test]
fn delegate() {
    let mut graph = TypeGraph::with_well_known();
    let int = builtin(&graph, wellknown::INT32);
    let int_ptr = graph.pointer_to(int, 1);
    let id = graph.insert(TypeNode::new(
        QualifiedName::new(SHELL, "LPFNCALLBACK"),
        TypeKind::Delegate {
            calling_convention: Some(CallingConvention::StdCall),
        },
    ));

    let mut ctor = Method::new(None, ".ctor");
    ctor.attributes = MethodAttributes::SPECIAL_NAME;
    let mut invoke = Method::new(None, "Invoke");
    invoke.return_type = Some(int);
    let mut value = Parameter::new("value", 1, int_ptr);
    value.attributes = ParamAttributes::OUT;
    invoke.parameters.push(value);
    graph[id].methods = vec![ctor, invoke];

    let text = emit(&graph, id).text;
    assert!(text.ends_with(
        "[UnmanagedFunctionPointer(CallingConvention.StdCall)]\n\
         public delegate int LPFNCALLBACK(nint /* out int */ value);\n"
    ));
}

#[test]
fn char_inline_array() {
    let mut graph = TypeGraph::with_well_known();
    let char_id = builtin(&graph, wellknown::CHAR);
    let id = graph.insert(TypeNode::new(
        QualifiedName::new(wellknown::INTEROP_TYPES_NAMESPACE, "InlineArrayChar_32"),
        TypeKind::InlineArray {
            element: char_id,
            size: 32,
        },
    ));

    let text = emit(&graph, id).text;
    assert!(text.contains("namespace System.Runtime.InteropServices.InteropTypes;\n"));
    assert!(text.contains("[InlineArray(InlineArrayChar_32.Length)]\npublic partial struct InlineArrayChar_32\n"));
    assert!(text.contains("    public const int Length = 32;\n\n    public char Data;\n"));
    assert!(text.contains("    public void CopyFrom(string? str) => DirectNExtensions.CopyFrom<InlineArrayChar_32>(str, this, Length);\n"));
}

#[test]
fn pointer_is_not_a_unit() {
    let mut graph = TypeGraph::with_well_known();
    let int = builtin(&graph, wellknown::INT32);
    let pointer = graph.pointer_to(int, 1);
    let generation = Generation::default();
    let arbiter = NameArbiter::new(None, "cs");
    let context = EmitContext {
        graph: &graph,
        generation: &generation,
        arbiter: &arbiter,
    };
    assert!(matches!(
        CSharpEmitter::new().emit(&context, pointer),
        Err(Error::NotSupported(_))
    ));
}
