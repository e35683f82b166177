// Helper macro to generate test functions based on field names
#[macro_export]
macro_rules! handle_case {
    ([$($attrs:meta)*] listing, $expected:expr) => {
        $(#[$attrs])*
        #[test]
        fn validate_listing() {
            let arena = bumpalo::Bump::new();
            let guard = compile(&arena).unwrap();
            pretty_assertions::assert_eq!(format!("{:?}", guard.code()), $expected);
        }
    };

    ([$($attrs:meta)*] runs, { $([$($arg:expr),* $(,)?] => $expected:expr),* $(,)? }) => {
        $(#[$attrs])*
        #[test]
        fn validate_runs() {
            let arena = bumpalo::Bump::new();
            let guard = compile(&arena).unwrap();
            let host = ilchain::HostMethods::new();
            $(
                let texts: &[&str] = &[$($arg),*];
                let args = guard.parse_args(texts).unwrap();
                let taken = guard.run(&host, &args).unwrap();
                pretty_assertions::assert_eq!(taken, $expected, "{} at {:?}", input(), texts);
            )*
        }
    };

    ([$($attrs:meta)*] error, $expected:expr) => {
        $(#[$attrs])*
        #[test]
        fn validate_error() {
            let arena = bumpalo::Bump::new();
            let err = match compile(&arena) {
                Err(e) => e,
                Ok(_) => panic!("Expected compilation error, but compilation succeeded"),
            };
            let rendered = ilchain::render_error_to_string_no_color(&err);
            let needles: &[&str] = &$expected;
            for needle in needles {
                assert!(rendered.contains(needle), "{:?} not in:\n{}", needle, rendered);
            }
        }
    };

    // Generic case for unknown field names
    ([$($attrs:meta)*] $field_name:ident, $expected:tt) => {
        compile_error!(concat!("Unknown test case field: ", stringify!($field_name)));
    };
}

// Helper macro to recursively parse assertion fields
#[macro_export]
macro_rules! parse_assertions {
    // Base case: no more fields to parse
    (@parse [$($test_functions:tt)*]) => {
        $($test_functions)*
    };

    (@parse [$($test_functions:tt)*] $(#[$attr:meta])* $field_name:ident: $field_value:tt, $($rest:tt)*) => {
        parse_assertions! {@parse [
            $($test_functions)*
            handle_case! {[$($attr)*] $field_name, $field_value}
        ] $($rest)*}
    };
}

// Main macro - name, input and params first, then any order for assertions
#[macro_export]
macro_rules! test_case {
    (
        name: $name:ident,
        input: $input:expr,
        params: $params:expr,
        $($assertion_fields:tt)*
    ) => {
        mod $name {
            #![allow(unused_imports, dead_code)]

            use super::*;

            fn input() -> &'static str {
                $input
            }

            static PARAMS: once_cell::sync::Lazy<Vec<ilchain::Type<'static>>> =
                once_cell::sync::Lazy::new(|| {
                    ilchain::MethodSignature::parse_params($params).unwrap()
                });

            fn compile<'a>(
                arena: &'a bumpalo::Bump,
            ) -> Result<ilchain::CompiledGuard<'a>, ilchain::Error> {
                ilchain::compile_guard(arena, input(), &PARAMS, ilchain::CompilationOptions::default())
            }

            parse_assertions! {@parse [] $($assertion_fields)*}
        }
    };
}
