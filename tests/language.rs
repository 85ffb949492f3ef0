use tessera::{
    Error, Module, Value, add_standard_functions,
    runtime::value::{VariableValue, new_variable},
};
use walkdir::WalkDir;

fn module_for(source: &str, main_declaration: &str) -> Module {
    let mut module = Module::new();
    add_standard_functions(&mut module);
    module.declare_public_function(main_declaration);
    module.load_source(source)
          .unwrap_or_else(|e| panic!("Script failed to load: {e}\n{source}"));
    module
}

fn run_number(source: &str) -> f64 {
    let mut module = module_for(source, "function number main()");
    match module.call_public("main", Vec::new()) {
        Ok(Value::Number(n)) => n,
        other => panic!("main() did not return a number: {other:?}"),
    }
}

fn run_string(source: &str) -> String {
    let mut module = module_for(source, "function string main()");
    match module.call_public("main", Vec::new()) {
        Ok(Value::String(s)) => s.as_ref().clone(),
        other => panic!("main() did not return a string: {other:?}"),
    }
}

fn compile_error(source: &str) -> tessera::error::CompileError {
    let mut module = Module::new();
    add_standard_functions(&mut module);
    match module.load_source(source) {
        Err(Error::Compile(e)) => e,
        Ok(()) => panic!("Script compiled but was expected to fail:\n{source}"),
        Err(e) => panic!("Script failed with the wrong error kind: {e}"),
    }
}

fn assert_compile_error(source: &str) {
    compile_error(source);
}

#[test]
fn sample_scripts_work() {
    let mut count = 0;

    for entry in
        WalkDir::new("tests/scripts").into_iter()
                                     .filter_map(Result::ok)
                                     .filter(|e| {
                                         e.path().extension().is_some_and(|ext| ext == "tess")
                                     })
    {
        count += 1;
        let path = entry.path();

        let mut module = Module::new();
        add_standard_functions(&mut module);
        module.declare_public_function("function void main()");

        let mut err = Vec::new();
        if !module.try_load(path.to_str().unwrap(), &mut err) {
            panic!("Sample script {:?} failed to load:\n{}",
                   path,
                   String::from_utf8_lossy(&err));
        }
        if let Err(e) = module.call_public("main", Vec::new()) {
            panic!("Sample script {path:?} failed: {e}");
        }
    }

    assert!(count > 0, "No sample scripts found in tests/scripts");
}

#[test]
fn function_calls_and_arithmetic() {
    let source = r"
        function number f(number x) { return x * x + 1; }
        public function number main() { return f(4); }
    ";
    assert_eq!(run_number(source), 17.0);
}

#[test]
fn string_building_loop() {
    let source = r#"
        function string join(string s, number n) {
            string r = "";
            for (number i = 0; i < n; ++i)
                r ..= s;
            return r;
        }
        public function string main() { return join("ab", 3); }
    "#;
    assert_eq!(run_string(source), "ababab");
}

#[test]
fn by_ref_parameters_alias_the_caller() {
    let source = r"
        function void inc(number& x) { x = x + 1; }
        public function number main() {
            number y = 10;
            inc(&y);
            return y;
        }
    ";
    assert_eq!(run_number(source), 11.0);
}

#[test]
fn by_ref_argument_must_be_an_lvalue() {
    assert_compile_error(r"
        function void inc(number& x) { x = x + 1; }
        public function number main() {
            inc(5);
            return 0;
        }
    ");
}

#[test]
fn by_value_parameter_rejects_reference_argument() {
    assert_compile_error(r"
        function void f(number x) { x = 1; }
        public function number main() {
            number y = 0;
            f(&y);
            return y;
        }
    ");
}

#[test]
fn logical_operators_short_circuit() {
    let source = r"
        public function number main() {
            number c = 0;
            if (0 && (c = 1)) {}
            if (1 || (c = c + 10)) {}
            return c;
        }
    ";
    assert_eq!(run_number(source), 0.0);
}

#[test]
fn arrays_grow_on_out_of_range_writes() {
    let source = r"
        public function number main() {
            number[] a;
            a[3] = 7;
            return sizeof a * 100 + a[0] * 10 + a[3];
        }
    ";
    assert_eq!(run_number(source), 407.0);
}

#[test]
fn sizeof_non_array_is_one() {
    assert_eq!(run_number("public function number main() { number x = 5; return sizeof x; }"),
               1.0);
}

#[test]
fn tuples_are_indexed_by_constants() {
    let source = r#"
        public function string main() {
            [number, string] t = {1, "x"};
            return t[1];
        }
    "#;
    assert_eq!(run_string(source), "x");
}

#[test]
fn tuple_index_out_of_range_is_rejected() {
    assert_compile_error(r#"
        public function string main() {
            [number, string] t = {1, "x"};
            return t[2];
        }
    "#);
}

#[test]
fn tuple_index_must_be_a_literal() {
    assert_compile_error(r#"
        public function number main() {
            [number, string] t = {1, "x"};
            number i = 0;
            return t[i];
        }
    "#);
}

#[test]
fn numeric_literals_support_hex_and_octal() {
    assert_eq!(run_number("public function number main() { return 0x1F; }"), 31.0);
    assert_eq!(run_number("public function number main() { return 017; }"), 15.0);
    assert_eq!(run_number("public function number main() { return 3.25; }"), 3.25);
    assert_eq!(run_number("public function number main() { return 1e3; }"), 1000.0);
}

#[test]
fn oversized_integer_literals_fall_back_to_double() {
    assert_eq!(run_number("public function number main() { return 100000000000000000000; }"),
               1e20);
}

#[test]
fn integer_division_and_modulo_truncate_toward_zero() {
    assert_eq!(run_number(r"public function number main() { return 7 \ 2; }"), 3.0);
    assert_eq!(run_number(r"public function number main() { return -7 \ 2; }"), -3.0);
    assert_eq!(run_number("public function number main() { return 7 % 3; }"), 1.0);
    assert_eq!(run_number("public function number main() { return -7 % 3; }"), -1.0);
}

#[test]
fn bitwise_and_shift_operators() {
    assert_eq!(run_number("public function number main() { return 12 & 10; }"), 8.0);
    assert_eq!(run_number("public function number main() { return 12 | 3; }"), 15.0);
    assert_eq!(run_number("public function number main() { return 12 ^ 10; }"), 6.0);
    assert_eq!(run_number("public function number main() { return 1 << 4; }"), 16.0);
    assert_eq!(run_number("public function number main() { return 32 >> 2; }"), 8.0);
    assert_eq!(run_number("public function number main() { return ~0; }"), -1.0);
}

#[test]
fn compound_assignments() {
    let source = r"
        public function number main() {
            number x = 4;
            x += 3;
            x *= 2;
            x -= 1;
            x /= 13;
            x <<= 3;
            x %= 5;
            return x;
        }
    ";
    assert_eq!(run_number(source), 3.0);
}

#[test]
fn multiply_assign_multiplies() {
    let source = r"
        public function number main() {
            number x = 6;
            x *= 7;
            return x;
        }
    ";
    assert_eq!(run_number(source), 42.0);
}

#[test]
fn string_comparisons_are_lexicographic() {
    assert_eq!(run_number(r#"public function number main() { return "abc" < "abd"; }"#), 1.0);
    assert_eq!(run_number(r#"public function number main() { return "b" >= "ba"; }"#), 0.0);
    assert_eq!(run_number(r#"public function number main() { return "x" == "x"; }"#), 1.0);
}

#[test]
fn numbers_convert_to_strings_implicitly() {
    assert_eq!(run_string(r#"public function string main() { string s = 5; return s; }"#), "5");
    assert_eq!(run_string(r#"public function string main() { return "n = " .. 4; }"#), "n = 4");
}

#[test]
fn tostring_formats_integral_numbers_without_a_fraction() {
    assert_eq!(run_string("public function string main() { return tostring 4; }"), "4");
    assert_eq!(run_string("public function string main() { return tostring 2.5; }"), "2.5");
    assert_eq!(run_string(r"
        public function string main() {
            number[] a;
            a[1] = 2;
            return tostring a;
        }
    "),
               "[0, 2]");
}

#[test]
fn increment_operators() {
    let source = r"
        public function number main() {
            number x = 5;
            number pre = ++x;
            number post = x++;
            return pre * 100 + post * 10 + x;
        }
    ";
    assert_eq!(run_number(source), 667.0);
}

#[test]
fn ternary_and_comma_operators() {
    assert_eq!(run_number("public function number main() { return 1 ? 4 : 7; }"), 4.0);
    assert_eq!(run_number("public function number main() { return 0 ? 4 : 7; }"), 7.0);

    let lvalue_ternary = r"
        public function number main() {
            number a = 1;
            number b = 2;
            (a < b ? a : b) = 10;
            return a * 10 + b;
        }
    ";
    assert_eq!(run_number(lvalue_ternary), 102.0);
}

#[test]
fn while_and_do_loops() {
    let source = r"
        public function number main() {
            number i = 0;
            number total = 0;
            while (i < 5) {
                total += i;
                ++i;
            }
            do {
                total += 100;
            } while (0)
            return total;
        }
    ";
    assert_eq!(run_number(source), 110.0);
}

#[test]
fn continue_skips_to_the_step() {
    let source = r"
        public function number main() {
            number total = 0;
            for (number i = 0; i < 10; ++i) {
                if (i % 2 == 0) { continue; }
                total += i;
            }
            return total;
        }
    ";
    assert_eq!(run_number(source), 25.0);
}

#[test]
fn break_exits_the_requested_number_of_levels() {
    let source = r"
        public function number main() {
            number total = 0;
            for (number i = 0; i < 3; ++i) {
                for (number j = 0; j < 3; ++j) {
                    if (j == 1) { break 2; }
                    total = total + 1;
                }
            }
            return total;
        }
    ";
    assert_eq!(run_number(source), 1.0);
}

#[test]
fn invalid_break_levels_are_rejected() {
    assert_compile_error(r"
        public function number main() {
            while (1) { break 0; }
            return 0;
        }
    ");
    assert_compile_error(r"
        public function number main() {
            while (1) { break 2; }
            return 0;
        }
    ");
    assert_compile_error(r"
        public function number main() {
            break;
            return 0;
        }
    ");
    assert_compile_error(r"
        public function number main() {
            continue;
            return 0;
        }
    ");
}

#[test]
fn switch_falls_through_and_honors_break() {
    let source = r"
        public function number main() {
            number r = 0;
            switch (2) {
                case 1:
                    r = 10;
                    break;
                case 2:
                    r = 20;
                case 3:
                    r = r + 1;
                    break;
                default:
                    r = 99;
            }
            return r;
        }
    ";
    assert_eq!(run_number(source), 21.0);
}

#[test]
fn switch_without_a_matching_case_uses_default() {
    let source = r"
        public function number main() {
            number r = 0;
            switch (7) {
                case 1:
                    r = 10;
                    break;
                default:
                    r = 99;
            }
            return r;
        }
    ";
    assert_eq!(run_number(source), 99.0);
}

#[test]
fn duplicate_case_labels_are_rejected() {
    assert_compile_error(r"
        public function number main() {
            switch (1) {
                case 1:
                    break;
                case 1:
                    break;
            }
            return 0;
        }
    ");
}

#[test]
fn declarations_in_a_switch_body_are_rejected() {
    assert_compile_error(r"
        public function number main() {
            switch (1) {
                case 1:
                    number x = 1;
                    break;
            }
            return 0;
        }
    ");
}

#[test]
fn elif_chains_and_header_declarations() {
    let source = r"
        function number classify(number x) {
            if (number doubled = x * 2; doubled < 4) {
                return 1;
            } elif (doubled < 8) {
                return 2;
            } else {
                return 3;
            }
        }
        public function number main() {
            return classify(1) * 100 + classify(3) * 10 + classify(9);
        }
    ";
    assert_eq!(run_number(source), 123.0);
}

#[test]
fn inner_scopes_shadow_but_same_scope_redeclaration_fails() {
    let shadowing = r"
        public function number main() {
            number x = 1;
            {
                number x = 2;
                x = x + 1;
            }
            return x;
        }
    ";
    assert_eq!(run_number(shadowing), 1.0);

    assert_compile_error(r"
        public function number main() {
            number x = 1;
            number x = 2;
            return x;
        }
    ");
}

#[test]
fn undeclared_identifiers_are_rejected() {
    assert_compile_error("public function number main() { return foo; }");
}

#[test]
fn void_variables_are_rejected() {
    assert_compile_error("void x; public function number main() { return 0; }");
}

#[test]
fn return_type_mismatches_are_rejected() {
    assert_compile_error("public function number main() { return; }");
    assert_compile_error("public function void main() { return 1; }");
    assert_compile_error(r#"
        public function number main() {
            string s = "x";
            return s;
        }
    "#);
}

#[test]
fn wrong_argument_counts_are_rejected() {
    assert_compile_error(r"
        function number f(number x, number y) { return x + y; }
        public function number main() { return f(3); }
    ");
}

#[test]
fn recursion_and_mutual_recursion() {
    let fib = r"
        function number fib(number n) {
            if (n < 2) { return n; }
            return fib(n - 1) + fib(n - 2);
        }
        public function number main() { return fib(10); }
    ";
    assert_eq!(run_number(fib), 55.0);

    let mutual = r"
        function number is_even(number n) {
            if (n == 0) { return 1; }
            return is_odd(n - 1);
        }
        function number is_odd(number n) {
            if (n == 0) { return 0; }
            return is_even(n - 1);
        }
        public function number main() { return is_even(10) * 10 + is_odd(4); }
    ";
    assert_eq!(run_number(mutual), 10.0);
}

#[test]
fn function_values_are_first_class() {
    let source = r"
        function number square(number x) { return x * x; }
        public function number main() {
            number(number) f = square;
            return f(6);
        }
    ";
    assert_eq!(run_number(source), 36.0);
}

#[test]
fn calling_an_unassigned_function_variable_fails_at_runtime() {
    let source = r"
        public function number main() {
            number(number) f;
            return f(1);
        }
    ";
    let mut module = module_for(source, "function number main()");
    assert!(module.call_public("main", Vec::new()).is_err());
}

#[test]
fn negative_array_indices_fail_at_runtime() {
    let source = r"
        public function number main() {
            number[] a;
            a[0 - 1] = 1;
            return 0;
        }
    ";
    let mut module = module_for(source, "function number main()");
    assert!(module.call_public("main", Vec::new()).is_err());
}

#[test]
fn arrays_are_passed_by_value_unless_by_ref() {
    let source = r"
        function void clobber(number[] a) { a[0] = 99; }
        function void fill(number[]& a) { a[0] = 42; }
        public function number main() {
            number[] a;
            a[0] = 1;
            clobber(a);
            number before = a[0];
            fill(&a);
            return before * 100 + a[0];
        }
    ";
    assert_eq!(run_number(source), 142.0);
}

#[test]
fn globals_initialize_in_order_and_reset() {
    let source = r"
        number counter = 0;
        public function number bump() {
            counter = counter + 1;
            return counter;
        }
    ";
    let mut module = module_for(source, "function number bump()");

    let first = module.call_public("bump", Vec::new()).unwrap();
    let second = module.call_public("bump", Vec::new()).unwrap();
    assert!(matches!(first, Value::Number(n) if n == 1.0));
    assert!(matches!(second, Value::Number(n) if n == 2.0));

    module.reset_globals().unwrap();

    let again = module.call_public("bump", Vec::new()).unwrap();
    assert!(matches!(again, Value::Number(n) if n == 1.0));
}

#[test]
fn globals_read_before_initialization_fail() {
    let source = r"
        function number peek() { return late; }
        number early = peek();
        number late = 5;
    ";
    let mut module = Module::new();
    add_standard_functions(&mut module);
    assert!(matches!(module.load_source(source), Err(Error::Runtime(_))));
}

#[test]
fn public_function_signature_must_match_declaration() {
    let mut module = Module::new();
    module.declare_public_function("function number main()");
    assert!(module.load_source("public function string main() { return \"x\"; }").is_err());
}

#[test]
fn declared_public_functions_must_be_defined() {
    let mut module = Module::new();
    module.declare_public_function("function number main()");
    assert!(module.load_source("number x = 1;").is_err());
}

#[test]
fn host_arguments_are_passed_positionally() {
    let source = r"
        public function number weight(string s, number n) {
            return strlen(s) * n;
        }
    ";
    let mut module = module_for(source, "function number weight(string, number)");
    let ret = module.call_public("weight", vec![Value::from("abcd"), Value::from(3.0)])
                    .unwrap();
    assert!(matches!(ret, Value::Number(n) if n == 12.0));
}

#[test]
fn host_lvalue_arguments_observe_by_ref_writes() {
    let source = "public function void bump(number& x) { x = x + 1; }";
    let mut module = module_for(source, "function void bump(number&)");

    let cell = new_variable(VariableValue::Number(10.0));
    module.call_public("bump", vec![Value::Lvalue(cell.clone())]).unwrap();

    assert!(matches!(&*cell.borrow(), VariableValue::Number(n) if *n == 11.0));
}

#[test]
fn unterminated_literals_are_parsing_errors() {
    assert_compile_error("string s = \"abc");
    assert_compile_error("number x = 1; /* comment");
}

#[test]
fn errors_carry_the_offending_position() {
    let source = "// comment\n/* block\n   comment */\nnumber x = ;\n";
    let e = compile_error(source);
    assert_eq!(e.line(), 3);
    assert_eq!(e.col(), 11);

    let report = tessera::error::report::report_to_string(&e, source);
    assert!(report.starts_with("(4) Syntax error"));
    assert!(report.contains("number x = ;"));

    let marker = report.lines().last().unwrap();
    assert_eq!(marker.len(), 12);
    assert!(marker.ends_with('^'));
}

#[test]
fn string_escapes_are_honored() {
    assert_eq!(run_string(r#"public function string main() { return "a\tb\n\"c\"\\"; }"#),
               "a\tb\n\"c\"\\");
}
