use serde_yaml::{Mapping, Value};

/// Outcome of looking up a key in a value tree
#[derive(Debug, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Missing,
    WrongType,
}

pub fn get_mapping<'a>(map: &'a Mapping, key: &str) -> Lookup<&'a Mapping> {
    match map.get(key) {
        Some(Value::Mapping(value)) => Lookup::Found(value),
        Some(_) => Lookup::WrongType,
        None => Lookup::Missing,
    }
}

pub fn get_str<'a>(map: &'a Mapping, key: &str) -> Lookup<&'a str> {
    match map.get(key) {
        Some(Value::String(value)) => Lookup::Found(value),
        Some(_) => Lookup::WrongType,
        None => Lookup::Missing,
    }
}

/// Read an image tag, integers are accepted and rendered in decimal
pub fn get_tag(map: &Mapping, key: &str) -> Lookup<String> {
    match map.get(key) {
        Some(Value::String(value)) => Lookup::Found(value.clone()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Lookup::Found(n.to_string()),
        Some(_) => Lookup::WrongType,
        None => Lookup::Missing,
    }
}

/// Merge `src` into `dest`, values from `src` win on conflict.
///
/// Nested mappings present on both sides are merged recursively, anything
/// else in `src` replaces the value in `dest` wholesale.
pub fn merge(dest: &mut Mapping, src: Mapping) {
    for (key, value) in src {
        if let Some(existing) = dest.get_mut(&key) {
            match (existing, value) {
                (Value::Mapping(existing), Value::Mapping(next)) => merge(existing, next),
                (existing, value) => *existing = value,
            }
        } else {
            dest.insert(key, value);
        }
    }
}

/// Fold an ordered list of trees into one, later trees take precedence
pub fn merge_all<I: IntoIterator<Item = Mapping>>(sources: I) -> Mapping {
    let mut base = Mapping::new();
    for src in sources {
        merge(&mut base, src);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::*;

    fn yaml(s: &str) -> Mapping {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_merge_scalar_precedence() {
        let mut dest = yaml("name: a\nreplicas: 1\nkeep: yes\n");
        merge(&mut dest, yaml("name: b\nreplicas: 3\n"));
        assert_eq!(dest, yaml("name: b\nreplicas: 3\nkeep: yes\n"));
    }

    #[test]
    fn test_merge_nested() {
        let mut dest = yaml(
            r#"
app:
  web:
    repository: gcr.io/proj/web
    tag: latest
    pullPolicy: Always
"#,
        );
        merge(
            &mut dest,
            yaml(
                r#"
app:
  web:
    tag: v1
  worker:
    repository: gcr.io/proj/worker
"#,
            ),
        );
        assert_eq!(
            dest,
            yaml(
                r#"
app:
  web:
    repository: gcr.io/proj/web
    tag: v1
    pullPolicy: Always
  worker:
    repository: gcr.io/proj/worker
"#
            )
        );
    }

    #[test]
    fn test_merge_type_changes() {
        // scalar replaced by mapping, mapping replaced by sequence
        let mut dest = yaml("a: 1\nb:\n  c: 2\n");
        merge(&mut dest, yaml("a:\n  x: y\nb: [1, 2]\n"));
        assert_eq!(dest, yaml("a:\n  x: y\nb: [1, 2]\n"));
    }

    #[test]
    fn test_merge_null_overwrites() {
        let mut dest = yaml("a:\n  b: 1\n");
        merge(&mut dest, yaml("a: null\n"));
        assert_eq!(dest, yaml("a: null\n"));
    }

    #[test]
    fn test_merge_idempotent() {
        let a = yaml("x:\n  y: 1\n  z: [1]\nw: foo\n");
        let b = yaml("x:\n  y: 2\n  q:\n    r: s\nw: bar\n");

        let mut once = a.clone();
        merge(&mut once, b.clone());
        let mut twice = once.clone();
        merge(&mut twice, b);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_all_order() {
        let merged = merge_all([
            yaml("a:\n  b:\n    c: 1\n    d: 1\n"),
            yaml("a:\n  b:\n    c: 2\n"),
            yaml("a:\n  b:\n    c: 3\n    e: 3\n"),
        ]);
        assert_eq!(merged, yaml("a:\n  b:\n    c: 3\n    d: 1\n    e: 3\n"));
    }

    #[test]
    fn test_lookup() -> Result<()> {
        let map = yaml("web:\n  repository: gcr.io/proj/web\n  tag: 42\nflag: true\n");
        let Lookup::Found(web) = get_mapping(&map, "web") else {
            bail!("Missing web mapping");
        };
        assert_eq!(get_str(web, "repository"), Lookup::Found("gcr.io/proj/web"));
        assert_eq!(get_tag(web, "tag"), Lookup::Found("42".to_string()));
        assert_eq!(get_str(web, "tag"), Lookup::WrongType);
        assert_eq!(get_mapping(&map, "flag"), Lookup::WrongType);
        assert_eq!(get_mapping(&map, "worker"), Lookup::Missing);
        Ok(())
    }

    #[test]
    fn test_tag_rejects_float_and_bool() {
        let map = yaml("a: 1.5\nb: false\n");
        assert_eq!(get_tag(&map, "a"), Lookup::WrongType);
        assert_eq!(get_tag(&map, "b"), Lookup::WrongType);
        assert_eq!(get_tag(&map, "c"), Lookup::Missing);
    }
}
