// Integration tests for the compiler

use mipscc::codegen::CodegenError;
use mipscc::parser::ParseError;
use mipscc::{compile, CompileError};
use pretty_assertions::assert_eq;

/// Lines of the function labelled `name`, up to the next top-level label
fn function_body<'a>(asm: &'a str, name: &str) -> Vec<&'a str> {
    let header = format!("{name}:");
    asm.lines()
        .skip_while(|line| *line != header)
        .skip(1)
        .take_while(|line| {
            line.starts_with('\t') || line.starts_with(".L") && !line.starts_with(".L_str_")
        })
        .collect()
}

#[test]
fn test_call_with_two_arguments() {
    let source = r#"
        int f(int a, int b) {
            return a + b;
        }

        int main() {
            return f(3, 4);
        }
    "#;

    let asm = compile(source).expect("compilation failed");
    let main = function_body(&asm, "main");
    let three = main.iter().position(|l| *l == "\tli $t0, 3").unwrap();
    let four = main.iter().position(|l| *l == "\tli $t0, 4").unwrap();
    let call = main.iter().position(|l| *l == "\tjal f").unwrap();
    assert!(three < four && four < call);
    assert_eq!(
        main[call - 3..call].to_vec(),
        vec!["\tlw $a0, 4($sp)", "\tlw $a1, 0($sp)", "\taddiu $sp, $sp, 8"]
    );

    // The callee spills both registers before touching its body
    let f = function_body(&asm, "f");
    assert_eq!(f[4], "\tsw $a0, -4($s8)");
    assert_eq!(f[5], "\tsw $a1, -8($s8)");

    // The entry stub hands main's result to exit
    assert!(asm.contains("\tjal main\n\tnop\n\tmove $a0, $v0\n\tli $v0, 4001\n\tsyscall\n"));
}

#[test]
fn test_fallback_epilogue_count() {
    let source = r#"
        int counter;

        void bump() {
            counter += 1;
        }

        int pick(int x) {
            if (x) return 1;
        }

        int main() {
            bump();
            return pick(counter);
        }
    "#;

    let asm = compile(source).unwrap();
    assert_eq!(asm.matches(".L_func_end_bump:").count(), 1);
    assert_eq!(asm.matches(".L_func_end_pick:").count(), 1);
    assert_eq!(asm.matches(".L_func_end_main:").count(), 0);
    // One epilogue per return statement plus the two fallbacks
    assert_eq!(asm.matches("\tjr $ra\n").count(), 4);
}

#[test]
fn test_parameter_spill_slots() {
    let asm = compile(
        "int f(int a, int b, int c, int d) { return a + b + c + d; } \
         int main() { return f(1, 2, 3, 4); }",
    )
    .unwrap();
    let f = function_body(&asm, "f");
    // 8 header bytes + four spill slots
    assert_eq!(
        f[..8].to_vec(),
        vec![
            "\taddiu $sp, $sp, -24",
            "\tsw $ra, 20($sp)",
            "\tsw $s8, 16($sp)",
            "\taddiu $s8, $sp, 16",
            "\tsw $a0, -4($s8)",
            "\tsw $a1, -8($s8)",
            "\tsw $a2, -12($s8)",
            "\tsw $a3, -16($s8)",
        ]
    );
}

#[test]
fn test_array_element_stores_scale_index() {
    let source = r#"
        int main() {
            int a[3];
            a[0] = 1;
            a[1] = 2;
            a[2] = 3;
            return a[1];
        }
    "#;

    let asm = compile(source).unwrap();
    let main = function_body(&asm, "main");
    assert_eq!(main.iter().filter(|l| **l == "\tli $t2, 4").count(), 4);
    // The array is only ever used for its address
    assert_eq!(main.iter().filter(|l| **l == "\taddiu $t0, $s8, -12").count(), 4);
    assert!(!main.iter().any(|l| l.contains("-12($s8)")));
}

#[test]
fn test_struct_member_layout() {
    let source = r#"
        struct Point {
            int x;
            int y;
        };

        struct Point p;

        int main() {
            p.x = 5;
            p.y = p.x + 1;
            return p.y;
        }
    "#;

    let asm = compile(source).unwrap();
    assert!(asm.contains("p: .space 8\n"));
    let main = function_body(&asm, "main");
    // x sits at offset 0 and needs no adjustment, y at offset 4
    assert_eq!(main.iter().filter(|l| **l == "\taddiu $t0, $t0, 4").count(), 2);
    assert!(!main.iter().any(|l| *l == "\taddiu $t0, $t0, 0"));
}

#[test]
fn test_pointer_returned_from_call_is_scaled() {
    let source = r#"
        int g[4];

        int *first() {
            return g;
        }

        int main() {
            return *(first() + 1);
        }
    "#;

    let asm = compile(source).unwrap();
    let main = function_body(&asm, "main");
    let call = main.iter().position(|l| *l == "\tjal first").unwrap();
    let add = main.iter().position(|l| *l == "\taddu $t0, $t0, $t1").unwrap();
    assert!(call < add);
    assert!(main[call..add].contains(&"\tli $t2, 4"));
    // Pushed, then dereferenced as an int
    assert_eq!(main[add + 4], "\tlw $t0, 0($t0)");
}

#[test]
fn test_member_of_returned_struct_pointer() {
    let source = r#"
        struct P {
            int x;
            char tag;
        };

        struct P s;

        struct P *get() {
            return &s;
        }

        int main() {
            get()->x = 3;
            return get()->tag;
        }
    "#;

    let asm = compile(source).unwrap();
    let main = function_body(&asm, "main");
    assert_eq!(main.iter().filter(|l| **l == "\tjal get").count(), 2);
    assert!(main.contains(&"\taddiu $t0, $t0, 4"));
    assert!(main.contains(&"\tlb $t0, 0($t0)"));
}

#[test]
fn test_short_circuit_does_not_call() {
    for source in [
        "int main() { return 0 && undefined_side_effect(); }",
        "int main() { return 1 || undefined_side_effect(); }",
    ] {
        let asm = compile(source).unwrap();
        assert!(!asm.contains("jal undefined_side_effect"), "{source}");
    }
}

#[test]
fn test_loop_jumps() {
    let source = r#"
        int main() {
            int sum = 0;
            int i;
            for (i = 0; i < 10; i++) {
                if (i == 3) continue;
                if (i == 7) break;
                sum += i;
            }
            while (sum > 0) {
                sum -= 1;
                if (sum == 5) break;
            }
            return sum;
        }
    "#;

    let asm = compile(source).unwrap();
    let main = function_body(&asm, "main");
    let pos = |needle: &str| main.iter().position(|l| *l == needle).unwrap();

    // for: ids 0 and 1; ifs: 2 and 3; while: 4; inner if: 5
    assert!(pos("\tj .Lcontinue1") < pos(".Lcontinue1:"));
    assert!(pos(".Lcontinue1:") < pos("\tj .L_begin_0"));
    assert!(pos("\tj .Lbreak0") < pos(".Lbreak0:"));
    assert!(pos(".Lbreak0:") < pos(".L_begin_4:"));
    assert!(pos("\tj .Lbreak4") < pos(".Lbreak4:"));
    assert_eq!(main[pos(".L_begin_4:") + 1], ".Lcontinue4:");
}

#[test]
fn test_strings_and_globals_layout() {
    let source = r#"
        char greeting[6];
        int count = 3;

        int main() {
            strcpy(greeting, "hi\t");
            printf("%d:%s\n", count);
            puts(greeting);
            return 0;
        }
    "#;

    let asm = compile(source).unwrap();
    assert!(asm.starts_with(".data\nstack: .space 4096\n\t.align 2\ngreeting: .space 6\n\t.align 2\ncount: .word 3\n.text\n"));
    assert!(asm.ends_with(".data\n.L_str_0: .asciiz \"hi\\t\"\n.L_str_1: .asciiz \"%d:%s\\n\"\n"));
}

#[test]
fn test_break_outside_loop_fails() {
    let err = compile("int main() { break; return 0; }").unwrap_err();
    assert!(matches!(
        err,
        CompileError::Codegen {
            source: CodegenError::BreakOutsideLoop { .. }
        }
    ));
    assert!(err.is_internal());

    let err = compile("int main() { continue; }").unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn test_parse_errors_carry_locations() {
    let source = "int main() {\n    int x = 1\n    return x;\n}";
    let err = compile(source).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Parse {
            source: ParseError::Expected { .. }
        }
    ));
    assert_eq!(err.location().map(|l| l.line), Some(3));

    let err = compile("int main() { return y; }").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Parse error at line 1, column 21: undefined variable 'y'"
    );

    let err = compile("int main() { return 1 @ 2; }").unwrap_err();
    assert!(matches!(
        err,
        CompileError::Parse {
            source: ParseError::Lex { .. }
        }
    ));
}

#[test]
fn test_oversized_arrays_are_rejected() {
    for source in [
        "int main() { int a[1073741824]; int x; x = 1; return x; }",
        "int a[2147483647][2147483647][2147483647]; int main() { return 0; }",
    ] {
        let err = compile(source).unwrap_err();
        assert!(
            matches!(
                err,
                CompileError::Parse {
                    source: ParseError::ObjectTooLarge { .. }
                }
            ),
            "{source}"
        );
    }
}

#[test]
fn test_missing_main() {
    let err = compile("int helper() { return 1; }").unwrap_err();
    assert!(matches!(
        err,
        CompileError::Codegen {
            source: CodegenError::MissingMain
        }
    ));
}

#[test]
fn test_linked_list_program() {
    let source = r#"
        struct Node {
            int value;
            struct Node *next;
        };

        int sum(struct Node *head) {
            int total = 0;
            while (head) {
                total += head->value;
                head = head->next;
            }
            return total;
        }

        int main() {
            struct Node a;
            struct Node b;
            a.value = 40;
            a.next = &b;
            b.value = 2;
            b.next = 0;
            printf("%d\n", sum(&a));
            return sum(&a);
        }
    "#;

    let asm = compile(source).unwrap();
    assert!(asm.contains("sum:\n"));
    assert_eq!(asm.matches("\tjal sum\n").count(), 2);
    // next lives one word after value
    assert!(asm.contains("\taddiu $t0, $t0, 4\n"));
}
