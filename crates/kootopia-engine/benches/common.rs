// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_kotlin_source(functions: usize) -> String {
    let mut source = String::from("package demo\n\n");
    for i in 0..functions {
        source.push_str(&format!(
            "// helper {i}\nfun helper{i}(x: Int): Int {{\n    val label = \"value {i}\"\n    println(label)\n    return x * {i}\n}}\n\n"
        ));
    }
    source
}

#[allow(dead_code)]
pub fn generate_compiler_output(errors: usize) -> String {
    let mut output = String::from("Compilation failed!\n");
    for i in 1..=errors {
        output.push_str(&format!(
            "Main.java:{i}:5: error: cannot find symbol\n  symbol: variable x{i}\n"
        ));
        output.push_str(&format!("  File \"script.py\", line {i}, in <module>\n"));
    }
    output.push_str(&format!("{errors} errors\n"));
    output
}
