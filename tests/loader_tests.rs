mod common;

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rstest::rstest;
    use wvm::config::Config;
    use wvm::parser::{self, module::ExportIndex};

    use crate::common::{main_module, ModuleBuilder, I32};

    const HEADER: [u8; 8] = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];

    fn with_header(sections: &[u8]) -> Vec<u8> {
        [&HEADER[..], sections].concat()
    }

    #[rstest]
    #[case::bad_magic(vec![0x00, 0x61, 0x73, 0x6e, 0x01, 0x00, 0x00, 0x00], "INVALID_MAGIC", 0)]
    #[case::bad_version(vec![0x00, 0x61, 0x73, 0x6d, 0x02, 0x00, 0x00, 0x00], "INVALID_VER", 4)]
    #[case::short_header(vec![0x00, 0x61, 0x73], "BAD_FSTREAM", 0)]
    #[case::unknown_section(with_header(&[0x0c, 0x00]), "INVALID_SECTION_ID", 8)]
    #[case::out_of_order(with_header(&[0x03, 0x01, 0x00, 0x01, 0x01, 0x00]), "INVALID_SECTION_ID", 11)]
    fn header_and_section_errors(#[case] bytes: Vec<u8>, #[case] code: &str, #[case] offset: usize) {
        let err = parser::load_bytes("bad", bytes).unwrap_err();
        assert_eq!(err.kind.code(), code, "{err}");
        assert_eq!(err.offset, offset);
    }

    #[rstest]
    #[case::truncated_section(&[0x01, 0x05, 0x01, 0x60], "BAD_FSTREAM")]
    #[case::bad_func_form(&[0x01, 0x04, 0x01, 0x61, 0x00, 0x00], "INVALID_FUNC_TYPE")]
    #[case::bad_value_type(&[0x01, 0x05, 0x01, 0x60, 0x01, 0x55, 0x00], "INVALID_FUNC_TYPE")]
    #[case::bad_elem_type(&[0x04, 0x04, 0x01, 0x6f, 0x00, 0x01], "INVALID_ELEM_TYPE")]
    #[case::varint_too_long(&[0x01, 0x06, 0x80, 0x80, 0x80, 0x80, 0x80, 0x00], "BAD_FSTREAM")]
    #[case::bad_global_mutability(&[0x06, 0x06, 0x01, 0x7f, 0x02, 0x41, 0x00, 0x0b], "INVALID_GLOBAL_SIG")]
    #[case::missing_code(&[0x01, 0x04, 0x01, 0x60, 0x00, 0x00, 0x03, 0x02, 0x01, 0x00], "BAD_FSTREAM")]
    #[case::function_type_out_of_bounds(&[0x03, 0x02, 0x01, 0x00], "INVALID_FUNC_TYPE")]
    #[case::section_size_mismatch(&[0x01, 0x05, 0x01, 0x60, 0x00, 0x00, 0x00], "BAD_FSTREAM")]
    fn section_content_errors(#[case] sections: &[u8], #[case] code: &str) {
        let err = parser::load_bytes("bad", with_header(sections)).unwrap_err();
        assert_eq!(err.kind.code(), code, "{err}");
    }

    #[test]
    fn load_error_through_runner() {
        let err = wvm::run_bytes("bad", vec![0x00, 0x61, 0x73, 0x6e], &Config::default()).unwrap_err();
        assert_eq!(err.code(), "INVALID_MAGIC");
        assert_eq!(err.offset(), Some(0));
    }

    #[test]
    fn missing_file() {
        let err = wvm::run_file(Path::new("/nonexistent/missing.wasm"), &Config::default()).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT_PATH");
    }

    #[test]
    fn module_shape() {
        let mut builder = ModuleBuilder::new();
        let typ = builder.typ(&[I32, I32], &[I32]);
        let add = builder.function(typ, &[I32], &[0x20, 0x00, 0x20, 0x01, 0x6a]);
        builder
            .export("add", add)
            .memory(1, Some(4))
            .data(16, b"hello")
            .custom("producers", &[1, 2, 3]);

        let module = parser::load_bytes("shape", builder.build()).unwrap();
        assert_eq!(module.name, "shape");
        assert_eq!(module.types[0].to_string(), "(i32, i32) -> i32");
        assert_eq!(module.code[0].locals.len(), 1);
        assert_eq!(module.code[0].code, vec![0x20, 0x00, 0x20, 0x01, 0x6a, 0x0b]);
        assert_eq!(module.exports[0].index, ExportIndex::Function(0));
        assert_eq!(module.exported_function("add"), Some(0));
        assert_eq!(module.memories[0].max, Some(4));
        assert_eq!(module.data[0].bytes, b"hello".to_vec());
        assert_eq!(module.custom[0].name, "producers");
        assert_eq!(module.custom[0].bytes, vec![1, 2, 3]);

        let summary = module.to_string();
        assert!(summary.contains("module 'shape' (version 1)"));
        assert!(summary.contains("func[0] sig=0 <add>"));
        assert!(summary.contains("68656c6c6f"));
    }

    #[test]
    fn code_position_is_module_offset() {
        let bytes = main_module(&[], &[], &[0x01]).build();
        let module = parser::load_bytes("pos", bytes.clone()).unwrap();
        let body = &module.code[0];
        assert_eq!(&bytes[body.position..body.position + body.code.len()], &body.code[..]);
    }
}
