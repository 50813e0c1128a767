//! HTML-like markup for documents and snippet fragments.
//!
//! The serializer emits one canonical spelling for every node. Parsing is lenient about
//! structure (unknown wrappers are flattened, stray end tags ignored) but rejects markup
//! that cannot be tokenized.

use std::fmt::Write as _;

use logos::{Lexer, Logos};

use crate::core::{Attrs, Document, ElementNode, MarkKind, Marks, Node, NodeKind, TextNode, VoidNode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unterminated tag starting at byte {0}")]
    UnterminatedTag(usize),
    #[error("unterminated attribute quote starting at byte {0}")]
    UnterminatedQuote(usize),
    #[error("unterminated comment starting at byte {0}")]
    UnterminatedComment(usize),
}

pub fn serialize_document(doc: &Document) -> String {
    serialize_nodes(&doc.children)
}

pub fn serialize_nodes(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

pub fn parse_document(markup: &str) -> Result<Document, ParseError> {
    let children = parse_fragment(markup)?;
    if children.is_empty() {
        return Ok(Document::empty());
    }
    Ok(Document::new(children))
}

/// Parses block-level markup. Loose inline content is wrapped in paragraphs.
pub fn parse_fragment(markup: &str) -> Result<Vec<Node>, ParseError> {
    let dom = build_dom(tokenize(markup)?);
    Ok(blocks(&dom))
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(t) => write_text(out, t),
        Node::Void(v) => write_void(out, v),
        Node::Element(el) => write_element(out, el),
    }
}

fn write_element(out: &mut String, el: &ElementNode) {
    let (tag, attrs) = match el.kind {
        NodeKind::Paragraph => ("p".to_string(), align_attr(el)),
        NodeKind::Heading => {
            let level = el.attr_u64("level").unwrap_or(1).clamp(1, 3);
            (format!("h{level}"), align_attr(el))
        }
        NodeKind::BulletList => ("ul".into(), String::new()),
        NodeKind::OrderedList => ("ol".into(), String::new()),
        NodeKind::ListItem => ("li".into(), String::new()),
        NodeKind::Table => {
            out.push_str("<table><tbody>");
            for child in &el.children {
                write_node(out, child);
            }
            out.push_str("</tbody></table>");
            return;
        }
        NodeKind::TableRow => ("tr".into(), String::new()),
        NodeKind::TableCell => ("td".into(), cell_attrs(el)),
        NodeKind::TableHeader => ("th".into(), cell_attrs(el)),
        NodeKind::DraggableItem => ("div".into(), " data-type=\"draggable-item\"".into()),
        // Atomic kinds stored as elements are written like their void form.
        NodeKind::Image | NodeKind::HorizontalRule | NodeKind::Mention => {
            write_void(
                out,
                &VoidNode {
                    kind: el.kind,
                    attrs: el.attrs.clone(),
                },
            );
            return;
        }
    };
    let _ = write!(out, "<{tag}{attrs}>");
    for child in &el.children {
        write_node(out, child);
    }
    let _ = write!(out, "</{tag}>");
}

fn write_void(out: &mut String, v: &VoidNode) {
    match v.kind {
        NodeKind::Image => {
            let _ = write!(out, "<img src=\"{}\"", escape_attr(v.attr_str("src").unwrap_or_default()));
            for name in ["alt", "title"] {
                if let Some(value) = v.attr_str(name) {
                    let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
                }
            }
            out.push('>');
        }
        NodeKind::HorizontalRule => out.push_str("<hr>"),
        NodeKind::Mention => {
            let label = v.attr_str("label").unwrap_or_default();
            let id = v.attr_str("id").unwrap_or(label);
            let _ = write!(
                out,
                "<span class=\"mention\" data-type=\"mention\" data-id=\"{}\" data-label=\"{}\">@{}</span>",
                escape_attr(id),
                escape_attr(label),
                escape_text(label)
            );
        }
        NodeKind::Paragraph
        | NodeKind::Heading
        | NodeKind::BulletList
        | NodeKind::OrderedList
        | NodeKind::ListItem
        | NodeKind::Table
        | NodeKind::TableRow
        | NodeKind::TableHeader
        | NodeKind::TableCell
        | NodeKind::DraggableItem => write_element(
            out,
            &ElementNode {
                kind: v.kind,
                attrs: v.attrs.clone(),
                children: Vec::new(),
            },
        ),
    }
}

const MARK_TAGS: [(MarkKind, &str); 6] = [
    (MarkKind::Bold, "strong"),
    (MarkKind::Italic, "em"),
    (MarkKind::Underline, "u"),
    (MarkKind::Strike, "s"),
    (MarkKind::Highlight, "mark"),
    (MarkKind::Superscript, "sup"),
];

fn write_text(out: &mut String, t: &TextNode) {
    if t.text.is_empty() {
        return;
    }
    let open: Vec<&str> = MARK_TAGS
        .iter()
        .filter(|(mark, _)| t.marks.has(*mark))
        .map(|(_, tag)| *tag)
        .collect();
    for tag in &open {
        let _ = write!(out, "<{tag}>");
    }
    out.push_str(&escape_text(&t.text).replace('\n', "<br>"));
    for tag in open.iter().rev() {
        let _ = write!(out, "</{tag}>");
    }
}

fn align_attr(el: &ElementNode) -> String {
    match el.attr_str("textAlign") {
        Some(align) if align != "left" => format!(" style=\"text-align: {}\"", escape_attr(align)),
        _ => String::new(),
    }
}

fn cell_attrs(el: &ElementNode) -> String {
    let mut out = String::new();
    for name in ["colspan", "rowspan"] {
        if let Some(span) = el.attr_u64(name).filter(|span| *span > 1) {
            let _ = write!(out, " {name}=\"{span}\"");
        }
    }
    if let Some(color) = el.attr_str("backgroundColor") {
        let color = escape_attr(color);
        let _ = write!(
            out,
            " data-background-color=\"{color}\" style=\"background-color: {color}\""
        );
    }
    out
}

pub(crate) fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub(crate) fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            }?;
            Some((ch, end + 1))
        });
        match decoded {
            Some((ch, len)) => {
                out.push(ch);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End(String),
    Text(String),
}

/// Lexing failure; positions are resolved against the token that raised it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum LexFault {
    #[default]
    UnterminatedTag,
    UnterminatedComment,
    /// Byte offset of the opening quote inside the attribute token.
    UnterminatedQuote(usize),
}

impl LexFault {
    fn at(self, tag_start: usize, token_start: usize) -> ParseError {
        match self {
            LexFault::UnterminatedTag => ParseError::UnterminatedTag(tag_start),
            LexFault::UnterminatedComment => ParseError::UnterminatedComment(token_start),
            LexFault::UnterminatedQuote(offset) => ParseError::UnterminatedQuote(token_start + offset),
        }
    }
}

/// Markup outside of tags.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(error = LexFault)]
enum Markup<'src> {
    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),

    /// A `<` that opens nothing, kept as text.
    #[token("<")]
    Lt,

    #[regex(r"<[a-zA-Z][a-zA-Z0-9-]*", |lex| lex.slice()[1..].to_ascii_lowercase())]
    StartTag(String),

    #[token("</", end_tag)]
    EndTag(String),

    #[token("<!--", comment)]
    #[regex(r"<[!?]", declaration)]
    Ignored,
}

fn end_tag<'s>(lex: &mut Lexer<'s, Markup<'s>>) -> Result<String, LexFault> {
    let rest = lex.remainder();
    let end = rest.find('>').ok_or(LexFault::UnterminatedTag)?;
    lex.bump(end + 1);
    Ok(rest[..end].trim().to_ascii_lowercase())
}

fn comment<'s>(lex: &mut Lexer<'s, Markup<'s>>) -> Result<(), LexFault> {
    let end = lex.remainder().find("-->").ok_or(LexFault::UnterminatedComment)?;
    lex.bump(end + 3);
    Ok(())
}

fn declaration<'s>(lex: &mut Lexer<'s, Markup<'s>>) -> Result<(), LexFault> {
    let end = lex.remainder().find('>').ok_or(LexFault::UnterminatedTag)?;
    lex.bump(end + 1);
    Ok(())
}

/// Attribute list of a start tag, up to its closing `>`.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(error = LexFault)]
#[logos(skip r"[ \t\r\n\f]+")]
enum TagPart<'src> {
    #[token(">")]
    Close,

    #[token("/>")]
    SelfClose,

    #[token("/")]
    Slash,

    #[regex(r"[^ \t\r\n\f=>/]+", |lex| lex.slice().to_ascii_lowercase())]
    Name(String),

    #[regex(r#"=[ \t\r\n\f]*"[^"]*""#, quoted)]
    #[regex(r"=[ \t\r\n\f]*'[^']*'", quoted)]
    #[regex(r#"=[ \t\r\n\f]*[^ \t\r\n\f"'>][^ \t\r\n\f>]*"#, |lex| lex.slice()[1..].trim_start())]
    #[token("=", |_| "")]
    Value(&'src str),

    #[regex(r#"=[ \t\r\n\f]*["']"#, open_quote)]
    OpenQuote,
}

fn quoted<'s>(lex: &mut Lexer<'s, TagPart<'s>>) -> &'s str {
    let value = lex.slice()[1..].trim_start();
    &value[1..value.len() - 1]
}

fn open_quote<'s>(lex: &mut Lexer<'s, TagPart<'s>>) -> Result<(), LexFault> {
    Err(LexFault::UnterminatedQuote(lex.slice().len() - 1))
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut lex = Markup::lexer(input);
    while let Some(result) = lex.next() {
        let start = lex.span().start;
        match result.map_err(|fault| fault.at(start, start))? {
            Markup::Text(text) => push_text(&mut tokens, &decode_entities(text)),
            Markup::Lt => push_text(&mut tokens, "<"),
            Markup::Ignored => {}
            Markup::EndTag(name) => tokens.push(Token::End(name)),
            Markup::StartTag(name) => {
                let mut tag = lex.morph::<TagPart>();
                tokens.push(start_tag(&mut tag, name, start)?);
                lex = tag.morph();
            }
        }
    }
    Ok(tokens)
}

/// Adjacent text runs (split by a loose `<` or a comment) are joined.
fn push_text(tokens: &mut Vec<Token>, text: &str) {
    match tokens.last_mut() {
        Some(Token::Text(prev)) => prev.push_str(text),
        _ => tokens.push(Token::Text(text.to_string())),
    }
}

fn start_tag<'s>(lex: &mut Lexer<'s, TagPart<'s>>, name: String, start: usize) -> Result<Token, ParseError> {
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut awaiting_value = false;
    while let Some(part) = lex.next() {
        let part = part.map_err(|fault| fault.at(start, lex.span().start))?;
        let self_closing = match part {
            TagPart::Close => false,
            TagPart::SelfClose => true,
            TagPart::Name(attr) => {
                attrs.push((attr, String::new()));
                awaiting_value = true;
                continue;
            }
            TagPart::Value(value) => {
                if let Some((_, slot)) = attrs.last_mut().filter(|_| awaiting_value) {
                    *slot = decode_entities(value);
                }
                awaiting_value = false;
                continue;
            }
            TagPart::Slash | TagPart::OpenQuote => {
                awaiting_value = false;
                continue;
            }
        };
        return Ok(Token::Start {
            name,
            attrs,
            self_closing,
        });
    }
    Err(ParseError::UnterminatedTag(start))
}

#[derive(Debug, Clone, PartialEq)]
enum Dom {
    Element {
        name: String,
        attrs: Vec<(String, String)>,
        children: Vec<Dom>,
    },
    Text(String),
}

impl Dom {
    fn attr(&self, wanted: &str) -> Option<&str> {
        match self {
            Dom::Element { attrs, .. } => attrs
                .iter()
                .find(|(name, _)| name == wanted)
                .map(|(_, value)| value.as_str()),
            Dom::Text(_) => None,
        }
    }

    fn style(&self, property: &str) -> Option<String> {
        self.attr("style")?.split(';').find_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            (name.trim().eq_ignore_ascii_case(property)).then(|| value.trim().to_string())
        })
    }

    fn is_whitespace(&self) -> bool {
        matches!(self, Dom::Text(t) if t.chars().all(char::is_whitespace))
    }
}

const VOID_TAGS: &[&str] = &["img", "hr", "br", "input", "meta", "link", "col", "wbr"];

fn build_dom(tokens: Vec<Token>) -> Vec<Dom> {
    // Stack of open elements; index 0 is the synthetic root.
    let mut stack: Vec<(String, Vec<(String, String)>, Vec<Dom>)> =
        vec![(String::new(), Vec::new(), Vec::new())];

    fn close_top(stack: &mut Vec<(String, Vec<(String, String)>, Vec<Dom>)>) {
        if let Some((name, attrs, children)) = stack.pop()
            && let Some(parent) = stack.last_mut()
        {
            parent.2.push(Dom::Element {
                name,
                attrs,
                children,
            });
        }
    }

    for token in tokens {
        match token {
            Token::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.2.push(Dom::Text(text));
                }
            }
            Token::Start {
                name,
                attrs,
                self_closing,
            } => {
                if self_closing || VOID_TAGS.contains(&name.as_str()) {
                    if let Some(top) = stack.last_mut() {
                        top.2.push(Dom::Element {
                            name,
                            attrs,
                            children: Vec::new(),
                        });
                    }
                } else {
                    stack.push((name, attrs, Vec::new()));
                }
            }
            Token::End(name) => {
                // Stray end tags with no open element are ignored.
                if let Some(depth) = stack.iter().skip(1).rposition(|(open, _, _)| *open == name) {
                    while stack.len() > depth + 1 {
                        close_top(&mut stack);
                    }
                }
            }
        }
    }
    while stack.len() > 1 {
        close_top(&mut stack);
    }
    stack.pop().map(|(_, _, children)| children).unwrap_or_default()
}

fn is_inline_dom(dom: &Dom) -> bool {
    match dom {
        Dom::Text(_) => true,
        Dom::Element { name, .. } => matches!(
            name.as_str(),
            "strong" | "b" | "em" | "i" | "u" | "s" | "strike" | "del" | "mark" | "sup" | "span" | "a"
                | "code" | "br" | "small" | "sub"
        ),
    }
}

/// Block content; loose inline runs become paragraphs, whitespace-only runs are dropped.
fn blocks(doms: &[Dom]) -> Vec<Node> {
    let mut out = Vec::new();
    let mut run: Vec<&Dom> = Vec::new();

    let flush = |run: &mut Vec<&Dom>, out: &mut Vec<Node>| {
        if run.iter().any(|dom| !dom.is_whitespace()) {
            let mut children = Vec::new();
            for dom in run.iter() {
                inline(dom, Marks::default(), &mut children);
            }
            out.push(Node::element(NodeKind::Paragraph, children));
        }
        run.clear();
    };

    for dom in doms {
        if is_inline_dom(dom) {
            run.push(dom);
            continue;
        }
        flush(&mut run, &mut out);
        block(dom, &mut out);
    }
    flush(&mut run, &mut out);
    out
}

/// Block content that must not be empty.
fn required_blocks(doms: &[Dom]) -> Vec<Node> {
    let mut children = blocks(doms);
    if children.is_empty() {
        children.push(Node::paragraph(""));
    }
    children
}

fn block(dom: &Dom, out: &mut Vec<Node>) {
    let Dom::Element { name, children, .. } = dom else {
        return;
    };
    match name.as_str() {
        "p" => out.push(textblock(NodeKind::Paragraph, dom, children)),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<u64>().unwrap_or(1).min(3);
            out.push(textblock(NodeKind::Heading, dom, children).with_attr("level", level));
        }
        "ul" | "ol" => {
            let kind = if name == "ul" {
                NodeKind::BulletList
            } else {
                NodeKind::OrderedList
            };
            let items: Vec<Node> = children
                .iter()
                .filter(|child| !child.is_whitespace())
                .map(|child| match child {
                    Dom::Element { name, children, .. } if name == "li" => {
                        Node::list_item(required_blocks(children))
                    }
                    other => Node::list_item(required_blocks(std::slice::from_ref(other))),
                })
                .collect();
            if !items.is_empty() {
                out.push(Node::element(kind, items));
            }
        }
        "img" => {
            if let Some(src) = dom.attr("src").filter(|src| !src.trim().is_empty()) {
                let mut image = Node::image(src);
                for attr in ["alt", "title"] {
                    if let Some(value) = dom.attr(attr) {
                        image = image.with_attr(attr, value);
                    }
                }
                out.push(image);
            }
        }
        "hr" => out.push(Node::horizontal_rule()),
        "table" => {
            let rows = table_rows(children);
            if !rows.is_empty() {
                out.push(Node::element(NodeKind::Table, rows));
            }
        }
        "div" if dom.attr("data-type") == Some("draggable-item") => {
            out.push(Node::draggable_item(required_blocks(children)));
        }
        // Unknown wrappers (div, section, li outside a list, ...) are flattened.
        _ => out.extend(blocks(children)),
    }
}

fn textblock(kind: NodeKind, dom: &Dom, children: &[Dom]) -> Node {
    let mut inlines = Vec::new();
    for child in children {
        inline(child, Marks::default(), &mut inlines);
    }
    let mut node = Node::element(kind, inlines);
    if let Some(align) = dom.style("text-align").filter(|align| align != "left") {
        node = node.with_attr("textAlign", align);
    }
    node
}

fn table_rows(children: &[Dom]) -> Vec<Node> {
    let mut rows = Vec::new();
    for child in children {
        let Dom::Element { name, children, .. } = child else {
            continue;
        };
        match name.as_str() {
            "thead" | "tbody" | "tfoot" => rows.extend(table_rows(children)),
            "tr" => {
                let cells = children
                    .iter()
                    .filter_map(|cell| match cell {
                        Dom::Element { name, children, .. } if name == "td" || name == "th" => {
                            let kind = if name == "th" {
                                NodeKind::TableHeader
                            } else {
                                NodeKind::TableCell
                            };
                            Some(table_cell(kind, cell, children))
                        }
                        _ => None,
                    })
                    .collect();
                rows.push(Node::element(NodeKind::TableRow, cells));
            }
            _ => {}
        }
    }
    rows
}

fn table_cell(kind: NodeKind, dom: &Dom, children: &[Dom]) -> Node {
    let mut attrs = Attrs::default();
    for name in ["colspan", "rowspan"] {
        if let Some(span) = dom
            .attr(name)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|span| *span > 1)
        {
            attrs.insert(name.to_string(), span.into());
        }
    }
    let color = dom
        .attr("data-background-color")
        .map(str::to_string)
        .or_else(|| dom.style("background-color"))
        .filter(|color| !color.is_empty());
    if let Some(color) = color {
        attrs.insert("backgroundColor".to_string(), color.into());
    }
    Node::Element(ElementNode {
        kind,
        attrs,
        children: required_blocks(children),
    })
}

fn inline(dom: &Dom, marks: Marks, out: &mut Vec<Node>) {
    let (name, children) = match dom {
        Dom::Text(text) => {
            out.push(Node::styled_text(text.as_str(), marks));
            return;
        }
        Dom::Element { name, children, .. } => (name.as_str(), children),
    };

    if dom.attr("data-type") == Some("mention") {
        let inner: String = children
            .iter()
            .filter_map(|child| match child {
                Dom::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        let label = dom
            .attr("data-label")
            .map(str::to_string)
            .unwrap_or_else(|| inner.trim_start_matches('@').to_string());
        let id = dom.attr("data-id").unwrap_or(&label).to_string();
        out.push(Node::mention(label, id));
        return;
    }

    let mark = match name {
        "strong" | "b" => Some(MarkKind::Bold),
        "em" | "i" => Some(MarkKind::Italic),
        "u" => Some(MarkKind::Underline),
        "s" | "strike" | "del" => Some(MarkKind::Strike),
        "mark" => Some(MarkKind::Highlight),
        "sup" => Some(MarkKind::Superscript),
        "br" => {
            out.push(Node::styled_text("\n", marks));
            return;
        }
        _ => None,
    };
    let marks = match mark {
        Some(mark) => marks.with(mark, true),
        None => marks,
    };
    for child in children {
        inline(child, marks, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entities_decode_and_unknown_ones_stay_literal() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt; &#65;&#x42;"), "a & b <c> AB");
        assert_eq!(decode_entities("R&D &bogus; x"), "R&D &bogus; x");
    }

    #[test]
    fn tokenizer_reports_unterminated_input() {
        assert_eq!(tokenize("<p class=\"x>hi"), Err(ParseError::UnterminatedQuote(9)));
        assert_eq!(tokenize("<p"), Err(ParseError::UnterminatedTag(0)));
        assert_eq!(tokenize("a<!-- b"), Err(ParseError::UnterminatedComment(1)));
        assert_eq!(tokenize("1 < 2"), Ok(vec![Token::Text("1 < 2".into())]));
        assert_eq!(tokenize("</p"), Err(ParseError::UnterminatedTag(0)));
    }

    #[test]
    fn tokenizer_reads_attribute_forms() {
        let tokens = tokenize(r#"<IMG src = a.png alt='x &amp; y' data-id="7" hidden/><!-- c --><?php ?>t</Em >"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Start {
                    name: "img".into(),
                    attrs: vec![
                        ("src".into(), "a.png".into()),
                        ("alt".into(), "x & y".into()),
                        ("data-id".into(), "7".into()),
                        ("hidden".into(), String::new()),
                    ],
                    self_closing: true,
                },
                Token::Text("t".into()),
                Token::End("em".into()),
            ]
        );
    }

    #[test]
    fn stray_end_tags_are_ignored() {
        let dom = build_dom(tokenize("<p>a</em>b</p>").unwrap());
        assert_eq!(
            dom,
            vec![Dom::Element {
                name: "p".into(),
                attrs: Vec::new(),
                children: vec![Dom::Text("a".into()), Dom::Text("b".into())],
            }]
        );
    }

    #[test]
    fn style_lookup_is_case_insensitive() {
        let dom = build_dom(tokenize("<td style=\"Background-Color: red; color: blue\"></td>").unwrap());
        assert_eq!(dom[0].style("background-color").as_deref(), Some("red"));
        assert_eq!(dom[0].style("text-align"), None);
    }
}
