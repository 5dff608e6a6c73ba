//! Minimal CSS selector matching.
//!
//! Supports comma-separated lists of compound selectors made of a type
//! selector (`div`, `*`), `#id`, `.class`, `[attr]` and `[attr=value]`.
//! Combinators are not supported.

use super::DomError;
use super::node::Node;

#[derive(Clone, Debug, PartialEq, Eq)]
struct AttrMatcher {
    name: String,
    value: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatcher>,
}

impl Compound {
    fn matches(&self, node: &Node) -> bool {
        let Some(tag) = node.tag_name() else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if expected != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.get_attribute("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| node.has_class(class)) {
            return false;
        }
        self.attrs.iter().all(|attr| match (&attr.value, node.get_attribute(&attr.name)) {
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => *expected == actual,
            _ => false,
        })
    }
}

/// A parsed selector list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Compound>,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && is_ident_char(chars[*pos]) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn parse_compound(source: &str) -> Result<Compound, DomError> {
    let invalid = || DomError::InvalidSelector(source.to_string());
    let chars: Vec<char> = source.chars().collect();
    let mut pos = 0;
    let mut compound = Compound::default();

    if chars.is_empty() {
        return Err(invalid());
    }

    if chars[0] == '*' {
        pos = 1;
    } else if is_ident_char(chars[0]) {
        compound.tag = Some(take_ident(&chars, &mut pos).to_ascii_lowercase());
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' => {
                pos += 1;
                let id = take_ident(&chars, &mut pos);
                if id.is_empty() {
                    return Err(invalid());
                }
                compound.id = Some(id);
            }
            '.' => {
                pos += 1;
                let class = take_ident(&chars, &mut pos);
                if class.is_empty() {
                    return Err(invalid());
                }
                compound.classes.push(class);
            }
            '[' => {
                pos += 1;
                let name = take_ident(&chars, &mut pos).to_ascii_lowercase();
                if name.is_empty() {
                    return Err(invalid());
                }
                let value = if chars.get(pos) == Some(&'=') {
                    pos += 1;
                    let quote = chars.get(pos).copied().filter(|c| *c == '"' || *c == '\'');
                    let value = match quote {
                        Some(q) => {
                            pos += 1;
                            let start = pos;
                            while pos < chars.len() && chars[pos] != q {
                                pos += 1;
                            }
                            let value: String = chars[start..pos].iter().collect();
                            pos += 1;
                            value
                        }
                        None => take_ident(&chars, &mut pos),
                    };
                    Some(value)
                } else {
                    None
                };
                if chars.get(pos) != Some(&']') {
                    return Err(invalid());
                }
                pos += 1;
                compound.attrs.push(AttrMatcher { name, value });
            }
            _ => return Err(invalid()),
        }
    }
    Ok(compound)
}

impl Selector {
    /// Parse a selector list.
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let compounds = source
            .split(',')
            .map(|part| parse_compound(part.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { compounds })
    }

    /// Whether `node` matches any selector of the list.
    pub fn matches(&self, node: &Node) -> bool {
        self.compounds.iter().any(|compound| compound.matches(node))
    }
}
