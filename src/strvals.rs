//! Parser for `--set` assignments like `app.image.tag=v2,hosts[0]=a,list={x,y}`

use crate::errors::*;
use serde_yaml::{Mapping, Value};

const MAX_INDEX: usize = 65536;

#[derive(Debug, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn new(s: &'a str) -> Self {
        Parser {
            chars: s.chars().peekable(),
        }
    }

    fn is_done(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    /// Read until one of `stops` (unescaped), the stop char is consumed and returned
    fn read_until(&mut self, stops: &[char]) -> (String, Option<char>) {
        let mut buf = String::new();
        while let Some(c) = self.chars.next() {
            if c == '\\' {
                if let Some(escaped) = self.chars.next() {
                    buf.push(escaped);
                }
            } else if stops.contains(&c) {
                return (buf, Some(c));
            } else {
                buf.push(c);
            }
        }
        (buf, None)
    }

    fn key(&mut self) -> Result<Vec<Segment>> {
        let mut path = Vec::new();
        let mut name = String::new();
        loop {
            let (part, stop) = self.read_until(&['.', '[', '=', ',']);
            name.push_str(&part);
            match stop {
                Some('.') => {
                    if name.is_empty() && !matches!(path.last(), Some(Segment::Index(_))) {
                        bail!("Empty key segment in {:?}", render(&path));
                    }
                    if !name.is_empty() {
                        path.push(Segment::Key(std::mem::take(&mut name)));
                    }
                }
                Some('[') => {
                    if !name.is_empty() {
                        path.push(Segment::Key(std::mem::take(&mut name)));
                    }
                    if path.is_empty() {
                        bail!("List index without a key");
                    }
                    let (idx, stop) = self.read_until(&[']']);
                    if stop.is_none() {
                        bail!("Unterminated list index: [{idx}");
                    }
                    let idx = idx
                        .trim()
                        .parse::<usize>()
                        .with_context(|| anyhow!("Invalid list index: {idx:?}"))?;
                    if idx > MAX_INDEX {
                        bail!("List index {idx} exceeds the maximum of {MAX_INDEX}");
                    }
                    path.push(Segment::Index(idx));
                }
                Some('=') => {
                    if !name.is_empty() {
                        path.push(Segment::Key(name));
                    }
                    if path.is_empty() {
                        bail!("Assignment without a key");
                    }
                    return Ok(path);
                }
                _ => {
                    path.push(Segment::Key(name));
                    bail!("Key {:?} has no value", render(&path));
                }
            }
        }
    }

    fn value(&mut self) -> Result<Value> {
        if self.chars.peek() == Some(&'{') {
            self.chars.next();
            let mut list = Vec::new();
            loop {
                let (item, stop) = self.read_until(&[',', '}']);
                match stop {
                    Some(',') => list.push(typed(&item)),
                    Some(_) => {
                        if !item.is_empty() || !list.is_empty() {
                            list.push(typed(&item));
                        }
                        break;
                    }
                    None => bail!("Unterminated list value: {{{item}"),
                }
            }
            match self.chars.next() {
                None | Some(',') => Ok(Value::Sequence(list)),
                Some(c) => bail!("Unexpected character {c:?} after list value"),
            }
        } else {
            let (value, _) = self.read_until(&[',']);
            Ok(typed(&value))
        }
    }
}

fn render(path: &[Segment]) -> String {
    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(idx) => out.push_str(&format!("[{idx}]")),
        }
    }
    out
}

fn typed(s: &str) -> Value {
    match s {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => {
            // keep leading zeros, those are usually not meant as numbers
            let leading_zero = s.len() > 1 && s.starts_with('0');
            match s.parse::<i64>() {
                Ok(n) if !leading_zero => Value::Number(n.into()),
                _ => Value::String(s.to_string()),
            }
        }
    }
}

fn set(node: &mut Value, path: &[Segment], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        *node = value;
        return;
    };
    match first {
        Segment::Key(key) => {
            if !node.is_mapping() {
                *node = Value::Mapping(Mapping::new());
            }
            if let Value::Mapping(map) = node {
                let key = Value::String(key.clone());
                if !map.contains_key(&key) {
                    map.insert(key.clone(), Value::Null);
                }
                if let Some(child) = map.get_mut(&key) {
                    set(child, rest, value);
                }
            }
        }
        Segment::Index(idx) => {
            if !node.is_sequence() {
                *node = Value::Sequence(Vec::new());
            }
            if let Value::Sequence(list) = node {
                if list.len() <= *idx {
                    list.resize(*idx + 1, Value::Null);
                }
                set(&mut list[*idx], rest, value);
            }
        }
    }
}

/// Parse a comma separated list of assignments and apply them to `dest`
pub fn parse_into(s: &str, dest: &mut Mapping) -> Result<()> {
    let mut parser = Parser::new(s);
    while !parser.is_done() {
        let path = parser.key()?;
        let value = parser.value()?;
        trace!("Applying override {:?} = {value:?}", render(&path));

        let Some((Segment::Key(key), rest)) = path.split_first() else {
            bail!("Assignment must start with a key: {:?}", render(&path));
        };
        let key = Value::String(key.clone());
        if !dest.contains_key(&key) {
            dest.insert(key.clone(), Value::Null);
        }
        if let Some(child) = dest.get_mut(&key) {
            set(child, rest, value);
        }
    }
    Ok(())
}
