//! IPPcode23 loader — source XML → validated [`Program`].
//!
//! The loader parses the XML container, canonicalizes instruction and
//! argument order, checks the opcode/argument arity matrix, and builds
//! the label table. Everything the executor indexes into is validated
//! here, before execution begins.
//!
//! # Usage
//!
//! ```
//! use ippcode_loader::load;
//!
//! let program = load(r#"
//!     <program language="IPPcode23">
//!       <instruction order="1" opcode="WRITE">
//!         <arg1 type="string">ok</arg1>
//!       </instruction>
//!     </program>
//! "#).unwrap();
//! assert_eq!(program.len(), 1);
//! ```

pub mod error;

pub use error::LoadError;

use std::collections::HashMap;

use ippcode_common::{Arg, ArgKind, Instruction, Opcode, Program};
use roxmltree::{Document, Node};

/// Parse and validate a source document.
///
/// A `roxmltree` parse failure is the well-formedness error; every check
/// on the resulting tree reports a structural, arity, or label error.
pub fn load(xml: &str) -> Result<Program, LoadError> {
    let doc = Document::parse(xml).map_err(|e| LoadError::MalformedXml(e.to_string()))?;
    let root = doc.root_element();

    if root.tag_name().name() != "program" {
        return Err(LoadError::BadRoot(root.tag_name().name().to_string()));
    }
    let language = root.attribute("language").unwrap_or("");
    if !language.eq_ignore_ascii_case("IPPcode23") {
        return Err(LoadError::BadLanguage(language.to_string()));
    }

    let mut instructions = Vec::new();
    for node in root.children().filter(Node::is_element) {
        instructions.push(parse_instruction(node)?);
    }

    instructions.sort_by_key(|ins| ins.order);
    for pair in instructions.windows(2) {
        if pair[0].order == pair[1].order {
            return Err(LoadError::DuplicateOrder(pair[0].order));
        }
    }

    let labels = build_label_table(&instructions)?;
    Ok(Program::new(instructions, labels))
}

/// Parse one `<instruction>` element.
fn parse_instruction(node: Node) -> Result<Instruction, LoadError> {
    let tag = node.tag_name().name();
    if tag != "instruction" {
        return Err(LoadError::UnexpectedElement(tag.to_string()));
    }

    let order_text = node.attribute("order").unwrap_or("");
    let order: i32 = order_text
        .parse()
        .map_err(|_| LoadError::BadOrder(order_text.to_string()))?;
    if order <= 0 {
        return Err(LoadError::BadOrder(order_text.to_string()));
    }

    let opcode_text = node.attribute("opcode").unwrap_or("");
    let opcode =
        Opcode::parse(opcode_text).ok_or_else(|| LoadError::UnknownOpcode(opcode_text.to_string()))?;

    let args = parse_args(node, order)?;
    if args.len() != opcode.arity() {
        return Err(LoadError::BadArity {
            order,
            opcode: opcode.mnemonic(),
            expected: opcode.arity(),
            found: args.len(),
        });
    }

    Ok(Instruction::new(order, opcode, args))
}

/// Collect `argN` children, sort them by suffix, and require the suffixes
/// to cover `1..=n` with no gaps or duplicates.
fn parse_args(node: Node, order: i32) -> Result<Vec<Arg>, LoadError> {
    let mut indexed: Vec<(usize, Arg)> = Vec::new();

    for child in node.children().filter(Node::is_element) {
        let tag = child.tag_name().name();
        let position = tag
            .strip_prefix("arg")
            .and_then(|digit| digit.parse::<usize>().ok())
            .filter(|n| (1..=3).contains(n))
            .ok_or_else(|| LoadError::BadArgElement {
                order,
                tag: tag.to_string(),
            })?;

        let type_attr = child.attribute("type").unwrap_or("");
        let kind = ArgKind::parse(type_attr).ok_or_else(|| LoadError::BadArgType {
            order,
            value: type_attr.to_string(),
        })?;

        let text = child.text().unwrap_or("").to_string();
        indexed.push((position, Arg::new(kind, text)));
    }

    indexed.sort_by_key(|(position, _)| *position);
    let count = indexed.len();
    for (slot, (position, _)) in indexed.iter().enumerate() {
        if *position != slot + 1 {
            return Err(LoadError::BadArgPositions { order, count });
        }
    }

    Ok(indexed.into_iter().map(|(_, arg)| arg).collect())
}

/// Single pass over the sorted instructions collecting `LABEL` targets.
///
/// A target is the index of the instruction after the `LABEL`, so jumping
/// to it resumes execution there directly.
fn build_label_table(instructions: &[Instruction]) -> Result<HashMap<String, usize>, LoadError> {
    let mut labels = HashMap::new();

    for (index, ins) in instructions.iter().enumerate() {
        if ins.opcode != Opcode::Label {
            continue;
        }
        // Arity is already validated, so the single argument exists.
        let arg = &ins.args[0];
        if arg.kind != ArgKind::Label {
            return Err(LoadError::LabelArgKind { order: ins.order });
        }
        if labels.insert(arg.text.clone(), index + 1).is_some() {
            return Err(LoadError::DuplicateLabel(arg.text.clone()));
        }
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_program() {
        let program = load(
            r#"<program language="IPPcode23">
                 <instruction order="1" opcode="CREATEFRAME"/>
               </program>"#,
        )
        .unwrap();
        assert_eq!(program.len(), 1);
        assert_eq!(program.instructions[0].opcode, Opcode::CreateFrame);
        assert!(program.instructions[0].args.is_empty());
    }

    #[test]
    fn empty_program_is_valid() {
        let program = load(r#"<program language="IPPcode23"/>"#).unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn language_is_case_insensitive() {
        assert!(load(r#"<program language="ippCODE23"/>"#).is_ok());
    }

    #[test]
    fn extra_root_attributes_are_ignored() {
        assert!(load(r#"<program language="IPPcode23" name="demo" description="d"/>"#).is_ok());
    }

    #[test]
    fn missing_text_is_empty_lexeme() {
        let program = load(
            r#"<program language="IPPcode23">
                 <instruction order="1" opcode="WRITE">
                   <arg1 type="string"></arg1>
                 </instruction>
               </program>"#,
        )
        .unwrap();
        assert_eq!(program.instructions[0].args[0].text, "");
    }

    #[test]
    fn malformed_xml() {
        let err = load("<program language=").unwrap_err();
        assert!(matches!(err, LoadError::MalformedXml(_)));
    }

    #[test]
    fn wrong_root() {
        let err = load(r#"<prog language="IPPcode23"/>"#).unwrap_err();
        assert_eq!(err, LoadError::BadRoot("prog".into()));
    }

    #[test]
    fn missing_language() {
        let err = load("<program/>").unwrap_err();
        assert_eq!(err, LoadError::BadLanguage(String::new()));
    }

    #[test]
    fn unknown_opcode() {
        let err = load(
            r#"<program language="IPPcode23">
                 <instruction order="1" opcode="NOP"/>
               </program>"#,
        )
        .unwrap_err();
        assert_eq!(err, LoadError::UnknownOpcode("NOP".into()));
    }

    #[test]
    fn zero_and_negative_orders_rejected() {
        for order in ["0", "-3", "", "two"] {
            let xml = format!(
                r#"<program language="IPPcode23">
                     <instruction order="{order}" opcode="BREAK"/>
                   </program>"#
            );
            let err = load(&xml).unwrap_err();
            assert_eq!(err, LoadError::BadOrder(order.into()), "order={order:?}");
        }
    }
}
