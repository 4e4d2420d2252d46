//! Structural parser for FGX components.
//!
//! A single forward cursor over the source text, no backtracking. At each
//! position the parser tries, in order: script block, element, `{binding}`,
//! plain text — an explicit attempt list driven by first success. Script
//! and expression content is handed to oxc; everything else is consumed
//! with the `matches`/`skip`/`read_while` primitives.

use oxc_allocator::Allocator;
use oxc_ast::ast::{Expression, Program};
use oxc_parser::Parser as ScriptParser;
use oxc_span::SourceType;
use tracing::debug;

use crate::ast::{Attribute, Document, Fragment};
use crate::error::{position, CompilerError, ERR_PARSE, ERR_SCRIPT_DUP, ERR_SYNTAX};

const SCRIPT_OPEN: &str = "<script>";
const SCRIPT_CLOSE: &str = "</script>";

/// Parse one component. All script/expression AST is allocated in `allocator`.
pub fn parse<'a>(
    allocator: &'a Allocator,
    source: &'a str,
) -> Result<Document<'a>, CompilerError> {
    let mut parser = Parser {
        allocator,
        source,
        index: 0,
        script: None,
    };
    let fragments = parser.parse_fragments(|p| p.at_end())?;
    debug!(
        fragments = fragments.len(),
        has_script = parser.script.is_some(),
        "parsed component"
    );
    Ok(Document {
        fragments,
        script: parser.script,
    })
}

type Attempt<'a> = fn(&mut Parser<'a>) -> Result<Option<Fragment<'a>>, CompilerError>;

struct Parser<'a> {
    allocator: &'a Allocator,
    source: &'a str,
    index: usize,
    script: Option<Program<'a>>,
}

impl<'a> Parser<'a> {
    fn parse_fragments(
        &mut self,
        stop: impl Fn(&Parser<'a>) -> bool,
    ) -> Result<Vec<Fragment<'a>>, CompilerError> {
        let mut fragments = Vec::new();
        while !stop(self) {
            if let Some(fragment) = self.parse_fragment()? {
                fragments.push(fragment);
            }
        }
        Ok(fragments)
    }

    fn parse_fragment(&mut self) -> Result<Option<Fragment<'a>>, CompilerError> {
        // Script blocks are tried first but never yield a fragment.
        if self.parse_script_block()? {
            return Ok(None);
        }
        let attempts: [Attempt<'a>; 3] = [
            Self::parse_element,
            Self::parse_binding,
            Self::parse_text,
        ];
        for attempt in attempts {
            if let Some(fragment) = attempt(self)? {
                return Ok(Some(fragment));
            }
        }
        Ok(None)
    }

    /// `<script>…</script>`. Returns whether a block was consumed.
    fn parse_script_block(&mut self) -> Result<bool, CompilerError> {
        if !self.matches(SCRIPT_OPEN) {
            return Ok(false);
        }
        let opened_at = self.index;
        self.skip(SCRIPT_OPEN)?;
        let start = self.index;
        let end = match self.source[start..].find(SCRIPT_CLOSE) {
            Some(rel) => start + rel,
            None => {
                return Err(CompilerError::at_offset(
                    ERR_PARSE,
                    "closing script tag not found",
                    self.source,
                    opened_at,
                ));
            }
        };
        if self.script.is_some() {
            return Err(CompilerError::at_offset(
                ERR_SCRIPT_DUP,
                "component has more than one script block",
                self.source,
                opened_at,
            ));
        }
        let code = &self.source[start..end];
        let ret = ScriptParser::new(self.allocator, code, SourceType::default()).parse();
        if let Some(error) = ret.errors.first() {
            let message = format!("invalid script: {:?}", error);
            return Err(CompilerError::at_offset(ERR_SYNTAX, &message, self.source, start));
        }
        self.script = Some(ret.program);
        self.index = end;
        self.skip(SCRIPT_CLOSE)?;
        Ok(true)
    }

    /// `<tag attr={expr} …>children</tag>`. Children are parsed by recursive
    /// descent, so a nested same-named element consumes its own closing tag
    /// before the stop condition here ever sees it.
    fn parse_element(&mut self) -> Result<Option<Fragment<'a>>, CompilerError> {
        if !self.matches("<") {
            return Ok(None);
        }
        self.skip("<")?;
        let name = self.read_while(|c| c.is_ascii_lowercase()).to_string();
        let attributes = self.parse_attribute_list()?;
        self.skip(">")?;
        let end_tag = format!("</{}>", name);
        let children = self.parse_fragments(|p| p.at_end() || p.matches(&end_tag))?;
        self.skip(&end_tag)?;
        Ok(Some(Fragment::Element {
            name,
            attributes,
            children,
        }))
    }

    fn parse_attribute_list(&mut self) -> Result<Vec<Attribute<'a>>, CompilerError> {
        let mut attributes = Vec::new();
        self.skip_whitespace();
        while !self.at_end() && !self.matches(">") {
            attributes.push(self.parse_attribute()?);
            self.skip_whitespace();
        }
        Ok(attributes)
    }

    fn parse_attribute(&mut self) -> Result<Attribute<'a>, CompilerError> {
        let name = self.read_while(|c| c != '=' && c != '>').to_string();
        self.skip("=")?;
        let (line, column) = position(self.source, self.index);
        let value = self.parse_braced_expression()?;
        Ok(Attribute {
            name,
            value,
            line,
            column,
        })
    }

    /// `{expr}` in fragment position.
    fn parse_binding(&mut self) -> Result<Option<Fragment<'a>>, CompilerError> {
        if !self.matches("{") {
            return Ok(None);
        }
        let (line, column) = position(self.source, self.index);
        let expression = self.parse_braced_expression()?;
        Ok(Some(Fragment::Binding {
            expression,
            line,
            column,
        }))
    }

    /// Longest run excluding `<` and `{`; whitespace-only runs are dropped.
    fn parse_text(&mut self) -> Result<Option<Fragment<'a>>, CompilerError> {
        let value = self.read_while(|c| c != '<' && c != '{');
        if value.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(Fragment::Text {
                value: value.to_string(),
            }))
        }
    }

    /// One expression delimited by `{` `}`. The span is found with a
    /// balanced-brace scan, then the interior goes through oxc's
    /// single-expression parser; the cursor lands past the closing brace.
    fn parse_braced_expression(&mut self) -> Result<Expression<'a>, CompilerError> {
        let open = self.index;
        if !self.matches("{") {
            return Err(CompilerError::at_offset(
                ERR_PARSE,
                "expecting \"{\"",
                self.source,
                open,
            ));
        }
        let end = match balanced_brace_end(self.source, open) {
            Some(end) => end,
            None => {
                return Err(CompilerError::at_offset(
                    ERR_PARSE,
                    "expecting \"}\"",
                    self.source,
                    open,
                ));
            }
        };
        let inner = &self.source[open + 1..end - 1];
        let expression = ScriptParser::new(self.allocator, inner, SourceType::default())
            .parse_expression()
            .map_err(|error| {
                let message = format!("invalid expression syntax: {:?}", error);
                CompilerError::at_offset(ERR_SYNTAX, &message, self.source, open)
            })?;
        self.index = end;
        Ok(expression)
    }

    // ── primitives ────────────────────────────────────────────────────────

    fn at_end(&self) -> bool {
        self.index >= self.source.len()
    }

    /// Peek, non-consuming.
    fn matches(&self, literal: &str) -> bool {
        self.source[self.index..].starts_with(literal)
    }

    /// Consume `literal` or fail naming it.
    fn skip(&mut self, literal: &str) -> Result<(), CompilerError> {
        if self.matches(literal) {
            self.index += literal.len();
            Ok(())
        } else {
            Err(CompilerError::at_offset(
                ERR_PARSE,
                &format!("expecting \"{}\"", literal),
                self.source,
                self.index,
            ))
        }
    }

    fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let start = self.index;
        for (i, c) in self.source[start..].char_indices() {
            if !predicate(c) {
                self.index = start + i;
                return &self.source[start..self.index];
            }
        }
        self.index = self.source.len();
        &self.source[start..]
    }

    fn skip_whitespace(&mut self) {
        self.read_while(char::is_whitespace);
    }
}

/// Byte offset just past the `}` matching the `{` at `start`, skipping
/// string and template-literal content. `None` when unbalanced.
fn balanced_brace_end(source: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string: Option<char> = None;
    let mut in_template = false;
    let mut template_braces = 0usize;
    let mut escaped = false;

    let mut chars = source[start..].char_indices();
    while let Some((i, c)) = chars.next() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if let Some(quote) = in_string {
            if c == quote {
                in_string = None;
            }
            continue;
        }
        if in_template {
            if c == '`' && template_braces == 0 {
                in_template = false;
            } else if c == '$' && source[start + i..].starts_with("${") {
                chars.next();
                template_braces += 1;
            } else if c == '}' && template_braces > 0 {
                template_braces -= 1;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_string = Some(c),
            '`' => in_template = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::identifier_name;
    use oxc_allocator::Allocator;

    fn shape(fragment: &Fragment<'_>) -> String {
        match fragment {
            Fragment::Element {
                name,
                attributes,
                children,
            } => {
                let attrs: Vec<String> = attributes.iter().map(|a| a.name.clone()).collect();
                let kids: Vec<String> = children.iter().map(shape).collect();
                format!("{}[{}]({})", name, attrs.join(","), kids.join(" "))
            }
            Fragment::Text { value } => format!("text({:?})", value),
            Fragment::Binding { expression, .. } => {
                format!("binding({})", identifier_name(expression).unwrap_or("?"))
            }
        }
    }

    #[test]
    fn test_plain_element_with_text() {
        let allocator = Allocator::default();
        let document = parse(&allocator, "<div>hello</div>").unwrap();
        assert!(document.script.is_none());
        assert_eq!(document.fragments.len(), 1);
        assert_eq!(shape(&document.fragments[0]), "div[](text(\"hello\"))");
    }

    #[test]
    fn test_script_element_and_binding() {
        let allocator = Allocator::default();
        let source = "<script>let count = 0;</script><button on:click={inc}>{count}</button>";
        let document = parse(&allocator, source).unwrap();
        assert!(document.script.is_some());
        assert_eq!(
            shape(&document.fragments[0]),
            "button[on:click](binding(count))"
        );
    }

    #[test]
    fn test_whitespace_only_text_dropped() {
        let allocator = Allocator::default();
        let document = parse(&allocator, "<div>\n  <span>{x}</span>\n</div>").unwrap();
        assert_eq!(shape(&document.fragments[0]), "div[](span[](binding(x)))");
    }

    #[test]
    fn test_nested_same_name_elements() {
        let allocator = Allocator::default();
        let document = parse(&allocator, "<div><div>inner</div>outer</div>").unwrap();
        assert_eq!(
            shape(&document.fragments[0]),
            "div[](div[](text(\"inner\")) text(\"outer\"))"
        );
    }

    #[test]
    fn test_missing_closing_tag_is_fatal() {
        let allocator = Allocator::default();
        let err = parse(&allocator, "<div>hello").unwrap_err();
        assert_eq!(err.code, ERR_PARSE);
        assert!(err.message.contains("</div>"));
    }

    #[test]
    fn test_unterminated_script_block() {
        let allocator = Allocator::default();
        let err = parse(&allocator, "<script>let x = 1;").unwrap_err();
        assert_eq!(err.code, ERR_PARSE);
        assert!(err.message.contains("closing script tag"));
    }

    #[test]
    fn test_duplicate_script_rejected() {
        let allocator = Allocator::default();
        let source = "<script>let a = 1;</script><script>let b = 2;</script>";
        let err = parse(&allocator, source).unwrap_err();
        assert_eq!(err.code, ERR_SCRIPT_DUP);
    }

    #[test]
    fn test_unmatched_attribute_brace() {
        let allocator = Allocator::default();
        let err = parse(&allocator, "<button on:click={inc>go</button>").unwrap_err();
        assert_eq!(err.code, ERR_PARSE);
        assert!(err.message.contains('}'));
    }

    #[test]
    fn test_balanced_brace_end() {
        assert_eq!(balanced_brace_end("{hello}", 0), Some(7));
        assert_eq!(balanced_brace_end("{a + b} tail", 0), Some(7));
        assert_eq!(balanced_brace_end("{obj.map(x => x)}", 0), Some(17));
        assert_eq!(balanced_brace_end("{'string with { brace'}", 0), Some(23));
        assert_eq!(balanced_brace_end("{`tpl ${a} }`}", 0), Some(14));
        assert_eq!(balanced_brace_end("{open", 0), None);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let source = "<div><span>{x}</span>tail</div>";
        let allocator_a = Allocator::default();
        let allocator_b = Allocator::default();
        let first = parse(&allocator_a, source).unwrap();
        let second = parse(&allocator_b, source).unwrap();
        let render = |d: &Document<'_>| {
            d.fragments.iter().map(shape).collect::<Vec<_>>().join("|")
        };
        assert_eq!(render(&first), render(&second));
    }
}
