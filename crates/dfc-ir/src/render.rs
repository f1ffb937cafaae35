//! Textual rendering of circuits and files as target-runtime source

use crate::error::{IrError, IrResult};
use crate::ir::circuit::{Circuit, DeclarationRef, File};
use crate::ir::operator::OperatorRef;
use crate::visit::{walk_circuit, walk_file, CircuitVisitor, VisitFlow};
use std::fmt::{self, Write};

const INDENT: &str = "    ";

/// Circuit visitor that writes each node as one line of source
#[derive(Debug, Default)]
pub struct CircuitPrinter {
    out: String,
    depth: usize,
    items: usize,
}

impl CircuitPrinter {
    /// Empty printer
    pub fn new() -> Self {
        Self::default()
    }

    /// Text written so far
    pub fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, text: impl fmt::Display) -> IrResult<()> {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        writeln!(self.out, "{text}").map_err(|e| IrError::traversal("circuit printer", e.to_string()))
    }

    fn separate_item(&mut self) {
        if self.depth == 0 {
            if self.items > 0 {
                self.out.push('\n');
            }
            self.items += 1;
        }
    }
}

impl CircuitVisitor for CircuitPrinter {
    fn preorder_circuit(&mut self, circuit: &Circuit) -> IrResult<VisitFlow> {
        self.separate_item();
        self.line(format_args!("fn {}(circuit: &mut RootCircuit) {{", circuit.name()))?;
        self.depth += 1;
        Ok(VisitFlow::Continue)
    }

    fn postorder_circuit(&mut self, _circuit: &Circuit) -> IrResult<()> {
        self.depth -= 1;
        self.line("}")
    }

    fn postorder_operator(&mut self, op: &OperatorRef) -> IrResult<()> {
        self.line(op)
    }

    fn postorder_declaration(&mut self, decl: &DeclarationRef) -> IrResult<()> {
        self.separate_item();
        self.line(decl)
    }
}

/// Source text of `circuit`
pub fn render_circuit(circuit: &Circuit) -> IrResult<String> {
    let mut printer = CircuitPrinter::new();
    walk_circuit(&mut printer, circuit)?;
    Ok(printer.finish())
}

/// Source text of `file`, items separated by blank lines
pub fn render_file(file: &File) -> IrResult<String> {
    let mut printer = CircuitPrinter::new();
    walk_file(&mut printer, file)?;
    Ok(printer.finish())
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_circuit(self).map_err(|_| fmt::Error)?)
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_file(self).map_err(|_| fmt::Error)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::circuit::{CircuitBuilder, FileItem};
    use crate::ir::expr::Expression;
    use crate::test_utils::*;

    #[test]
    fn test_render_circuit_lines_in_order() {
        let circuit = sample_circuit();
        let text = render_circuit(&circuit).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "fn sample(circuit: &mut RootCircuit) {");
        assert_eq!(
            lines[1],
            "    let stream0: OrdZSet<(i32, Option<F64>), i64> = circuit.add_source(\"T\");"
        );
        assert_eq!(
            lines[2],
            "    let stream1: OrdZSet<i32, i64> = stream0.map(move |t: &(i32, Option<F64>)| -> i32 { t.0 });"
        );
        assert_eq!(
            lines[3],
            "    let stream2: OrdZSet<i32, i64> = stream1.output(\"V\");"
        );
        assert_eq!(lines[4], "}");
    }

    #[test]
    fn test_render_file_separates_items() {
        let mut builder = CircuitBuilder::new("empty");
        builder.add_declaration("LIMIT", Expression::int32(10));
        let file = File::new(vec![
            FileItem::Declaration(crate::ir::circuit::Declaration::new(
                "ANSWER",
                Expression::int64(42),
            )),
            FileItem::Circuit(builder.build()),
        ]);
        assert_eq!(
            file.to_string(),
            "let ANSWER: i64 = 42i64;\n\nfn empty(circuit: &mut RootCircuit) {\n    let LIMIT: i32 = 10i32;\n}\n"
        );
    }
}
