//! End-to-end pipeline tests: whole components in, module text or a fatal
//! error out.

use crate::compile;
use crate::error::{ERR_PARSE, ERR_SYNTAX};

fn offset_of(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("expected {:?} in generated module:\n{}", needle, haystack))
}

#[test]
fn test_static_element() {
    // <div>hello</div>, no script: create builds div + text, update stays
    // empty, destroy only detaches the div from its mount target.
    let code = compile("<div>hello</div>").unwrap();

    let create_div = offset_of(&code, "div_1 = document.createElement('div');");
    let create_txt = offset_of(&code, "txt_2 = document.createTextNode('hello');");
    let append_txt = offset_of(&code, "div_1.appendChild(txt_2);");
    let append_div = offset_of(&code, "target.appendChild(div_1);");
    assert!(create_div < create_txt);
    assert!(create_txt < append_txt);
    assert!(append_txt < append_div);

    assert!(code.contains("update(changed) {\n    }"));
    assert!(code.contains("destroy() {\n      target.removeChild(div_1);\n    }"));
}

#[test]
fn test_counter_component() {
    let code = compile(
        "<script>let count = 0; function inc() { count++; }</script>\
         <button on:click={inc}>{count}</button>",
    )
    .unwrap();

    // The bound text node refreshes when "count" is in the changed set.
    assert!(code.contains("if (changed.includes('count')) { txt_2.data = count; }"));
    // The author's plain mutation now notifies the lifecycle object.
    assert!(code.contains("count++, lifecycle.update([\"count\"])"));
    // Event wiring is symmetric across create/destroy.
    assert!(code.contains("button_1.addEventListener('click', inc);"));
    assert!(code.contains("button_1.removeEventListener('click', inc);"));
    // The module exports a zero-argument factory returning the triple.
    assert!(code.starts_with("export default function() {"));
    assert!(code.contains("return lifecycle;"));
}

#[test]
fn test_unmatched_brace_produces_no_module() {
    let err = compile("<button on:click={inc>go</button>").unwrap_err();
    assert_eq!(err.code, ERR_PARSE);
}

#[test]
fn test_invalid_script_is_fatal() {
    let err = compile("<script>let = ;</script><p>x</p>").unwrap_err();
    assert_eq!(err.code, ERR_SYNTAX);
}

#[test]
fn test_nested_elements_create_order() {
    // Depth-first, parent created before children, parent appended after
    // its subtree is complete.
    let code = compile("<div><span>{x}</span></div>").unwrap();

    let create_div = offset_of(&code, "div_1 = document.createElement('div');");
    let create_span = offset_of(&code, "span_2 = document.createElement('span');");
    let create_txt = offset_of(&code, "txt_3 = document.createTextNode(x);");
    let append_txt = offset_of(&code, "span_2.appendChild(txt_3);");
    let append_span = offset_of(&code, "div_1.appendChild(span_2);");
    let append_div = offset_of(&code, "target.appendChild(div_1);");

    assert!(create_div < create_span);
    assert!(create_span < create_txt);
    assert!(create_txt < append_txt);
    assert!(append_txt < append_span);
    assert!(append_span < append_div);
}

#[test]
fn test_only_template_read_mutations_notify() {
    let code = compile(
        "<script>let a = 0; let b = 0; function f() { a++; b++; }</script><p>{a}</p>",
    )
    .unwrap();
    assert!(code.contains("a++, lifecycle.update([\"a\"])"));
    assert!(!code.contains("lifecycle.update([\"b\"])"));
}

#[test]
fn test_compile_is_deterministic() {
    let source = "<script>let n = 0; function bump() { n++; }</script>\
                  <div><button on:click={bump}>{n}</button>tail</div>";
    let first = compile(source).unwrap();
    let second = compile(source).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_error_serializes() {
    let err = compile("<div>oops").unwrap_err();
    let value = serde_json::to_value(&err).unwrap();
    assert_eq!(value["code"], "FGX-ERR-PARSE");
    assert!(value["message"].as_str().unwrap().contains("</div>"));
}
