//! Golden disassembly tests. The dump format is part of the crate's
//! contract; these strings are fixed.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use dfilter_vm::prelude::*;

fn registry() -> Arc<FieldRegistry> {
    let mut registry = FieldRegistry::new();
    registry.register("ip.src", FType::Ipv4);
    registry.register("tcp.port", FType::Uint16);
    registry.register("udp.port", FType::Uint16);
    registry.register("http.host", FType::String);
    Arc::new(registry)
}

fn dump(filter: &str) -> String {
    let program = compile(&registry(), filter).unwrap_or_else(|e| panic!("{filter}: {e}"));
    let mut out = String::new();
    program.dump(&mut out).unwrap();
    out
}

#[test]
fn dump_any_eq() {
    assert_eq!(
        dump("ip.src == 10.0.0.1"),
        "Constants:\n\
         00000 PUT_FVALUE\t10.0.0.1 <FT_IPv4> -> reg#1\n\
         \n\
         Instructions:\n\
         00000 READ_TREE\t\tip.src -> reg#0\n\
         00001 ANY_EQ\t\treg#0 == reg#1\n\
         00002 RETURN\n"
    );
}

#[test]
fn dump_set_membership() {
    assert_eq!(
        dump("tcp.port in {80, 443, 8080}"),
        "Constants:\n\
         00000 PUT_FVALUE\t80 <FT_UINT16> -> reg#1\n\
         00001 PUT_FVALUE\t443 <FT_UINT16> -> reg#2\n\
         00002 PUT_FVALUE\t8080 <FT_UINT16> -> reg#3\n\
         \n\
         Instructions:\n\
         00000 READ_TREE\t\ttcp.port -> reg#0\n\
         00001 ANY_EQ\t\treg#0 == reg#1\n\
         00002 IF-TRUE-GOTO\t6\n\
         00003 ANY_EQ\t\treg#0 == reg#2\n\
         00004 IF-TRUE-GOTO\t6\n\
         00005 ANY_EQ\t\treg#0 == reg#3\n\
         00006 RETURN\n"
    );
}

#[test]
fn dump_set_range() {
    assert_eq!(
        dump("tcp.port in {100..200}"),
        "Constants:\n\
         00000 PUT_FVALUE\t100 <FT_UINT16> -> reg#1\n\
         00001 PUT_FVALUE\t200 <FT_UINT16> -> reg#2\n\
         \n\
         Instructions:\n\
         00000 READ_TREE\t\ttcp.port -> reg#0\n\
         00001 ANY_IN_RANGE\treg#0 in range reg#1,reg#2\n\
         00002 RETURN\n"
    );
}

#[test]
fn dump_slice() {
    assert_eq!(
        dump("ip.src[0:2] == 0a:00"),
        "Constants:\n\
         00000 PUT_FVALUE\t0a:00 <FT_BYTES> -> reg#2\n\
         \n\
         Instructions:\n\
         00000 READ_TREE\t\tip.src -> reg#0\n\
         00001 MK_RANGE\t\treg#0[0:2] -> reg#1\n\
         00002 ANY_EQ\t\treg#1 == reg#2\n\
         00003 RETURN\n"
    );
}

#[test]
fn dump_multi_node_range() {
    assert_eq!(
        dump("ip.src[0:2,1-2,3:] == 0a:00"),
        "Constants:\n\
         00000 PUT_FVALUE\t0a:00 <FT_BYTES> -> reg#2\n\
         \n\
         Instructions:\n\
         00000 READ_TREE\t\tip.src -> reg#0\n\
         00001 MK_RANGE\t\treg#0[0:2,1-2,3:] -> reg#1\n\
         00002 ANY_EQ\t\treg#1 == reg#2\n\
         00003 RETURN\n"
    );
}

#[test]
fn dump_pcre() {
    assert_eq!(
        dump("http.host matches \"ex.mple\""),
        "Constants:\n\
         00000 PUT_PCRE  \tex.mple <Regex> -> reg#1\n\
         \n\
         Instructions:\n\
         00000 READ_TREE\t\thttp.host -> reg#0\n\
         00001 ANY_MATCHES\treg#0 matches reg#1\n\
         00002 RETURN\n"
    );
}

#[test]
fn dump_short_circuit_and() {
    assert_eq!(
        dump("tcp.port == 80 and udp.port == 53"),
        "Constants:\n\
         00000 PUT_FVALUE\t80 <FT_UINT16> -> reg#2\n\
         00001 PUT_FVALUE\t53 <FT_UINT16> -> reg#3\n\
         \n\
         Instructions:\n\
         00000 READ_TREE\t\ttcp.port -> reg#0\n\
         00001 ANY_EQ\t\treg#0 == reg#2\n\
         00002 IF-FALSE-GOTO\t5\n\
         00003 READ_TREE\t\tudp.port -> reg#1\n\
         00004 ANY_EQ\t\treg#1 == reg#3\n\
         00005 RETURN\n"
    );
}

#[test]
fn dump_exists_and_not() {
    assert_eq!(
        dump("not udp.port"),
        "Constants:\n\
         \n\
         Instructions:\n\
         00000 CHECK_EXISTS\tudp.port\n\
         00001 NOT\n\
         00002 RETURN\n"
    );
}

#[test]
fn dump_string_constant() {
    assert_eq!(
        dump("http.host == \"x\""),
        "Constants:\n\
         00000 PUT_FVALUE\t\"x\" <FT_STRING> -> reg#1\n\
         \n\
         Instructions:\n\
         00000 READ_TREE\t\thttp.host -> reg#0\n\
         00001 ANY_EQ\t\treg#0 == reg#1\n\
         00002 RETURN\n"
    );
}

#[test]
fn dump_function_call() {
    assert_eq!(
        dump("len(http.host) > 2"),
        "Constants:\n\
         00000 PUT_FVALUE\t2 <FT_UINT32> -> reg#2\n\
         \n\
         Instructions:\n\
         00000 READ_TREE\t\thttp.host -> reg#0\n\
         00001 CALL_FUNCTION\tlen (reg#0) --> reg#1\n\
         00002 ANY_GT\t\treg#1 == reg#2\n\
         00003 RETURN\n"
    );
}

#[test]
fn dumps_are_deterministic() {
    let filter = "tcp.port in {80, 443} and ip.src == 10.0.0.1";
    assert_eq!(dump(filter), dump(filter));
}
