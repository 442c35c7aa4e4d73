//! Graphviz (DOT) export.

use std::io::{self, Write};

use crate::bdd::Bdd;
use crate::node::{LeafTag, Node};
use crate::reference::Ref;

impl Bdd {
    /// Writes the diagrams rooted at `roots` in DOT format.
    ///
    /// Solid arrows are high edges, dashed arrows are low edges, and a
    /// `dot` arrowhead marks a complemented edge.
    pub fn to_dot(&self, writer: &mut impl Write, roots: &[Ref]) -> io::Result<()> {
        writeln!(writer, "digraph bdd {{")?;

        let mut indices: Vec<u32> = self.descendants(roots.iter().copied()).into_iter().collect();
        indices.sort_unstable();

        for &i in &indices {
            match self.node(i) {
                Node::Internal { variable, .. } => {
                    writeln!(writer, "  n{} [shape=circle, label=\"x{}\"];", i, variable)?;
                }
                Node::Leaf { tag: LeafTag::Bool, .. } => {
                    writeln!(writer, "  n{} [shape=box, label=\"1\"];", i)?;
                }
                Node::Leaf { tag: LeafTag::Int, value } => {
                    writeln!(writer, "  n{} [shape=box, label=\"{}\"];", i, value as i64)?;
                }
                Node::Map { variable, .. } => {
                    writeln!(writer, "  n{} [shape=diamond, label=\"x{} :=\"];", i, variable)?;
                }
            }
        }

        for (k, &root) in roots.iter().enumerate() {
            writeln!(writer, "  r{} [shape=none, label=\"{}\"];", k, root)?;
            writeln!(
                writer,
                "  r{} -> n{}{};",
                k,
                root.index(),
                if root.is_negated() { " [arrowhead=dot]" } else { "" }
            )?;
        }

        for &i in &indices {
            match self.node(i) {
                Node::Internal { low, high, .. } => {
                    write_edge(writer, i, high, "")?;
                    write_edge(writer, i, low, ", style=dashed")?;
                }
                Node::Leaf { .. } => {}
                Node::Map { replace, next, .. } => {
                    write_edge(writer, i, replace, "")?;
                    write_edge(writer, i, next, ", style=dotted")?;
                }
            }
        }

        writeln!(writer, "}}")
    }
}

fn write_edge(writer: &mut impl Write, from: u32, to: Ref, style: &str) -> io::Result<()> {
    writeln!(
        writer,
        "  n{} -> n{} [{}{}];",
        from,
        to.index(),
        if to.is_negated() { "arrowhead=dot" } else { "arrowhead=normal" },
        style
    )
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::bdd::Bdd;

    #[test]
    fn test_to_dot() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let f = bdd.apply_and(x1, -x2);

        let mut out = Vec::new();
        bdd.to_dot(&mut out, &[f]).unwrap();
        let dot = String::from_utf8(out).unwrap();

        assert!(dot.starts_with("digraph bdd {"));
        assert!(dot.trim_end().ends_with('}'));
        assert!(dot.contains("label=\"x1\""));
        assert!(dot.contains("label=\"x2\""));
        assert!(dot.contains("shape=box, label=\"1\""));
        // At least one edge of this diagram carries a complement mark.
        assert!(dot.contains("arrowhead=dot"));
    }

    #[test]
    fn test_to_dot_int_leaves() {
        let bdd = Bdd::default();

        let f = bdd.mk_node(1, bdd.mk_int_leaf(-5), bdd.mk_int_leaf(3));
        let mut out = Vec::new();
        bdd.to_dot(&mut out, &[f]).unwrap();
        let dot = String::from_utf8(out).unwrap();

        assert!(dot.contains("label=\"-5\""));
        assert!(dot.contains("label=\"3\""));
    }
}
