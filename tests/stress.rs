use nestconf::{Kind, Options};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
enum Expected {
    Ints(Vec<i64>),
    Dbls(Vec<f64>),
    Strs(Vec<String>),
}

const SEGMENTS: &[&str] = &["a", "b", "srv", "x.y", "k9", "deep"];

fn random_value(rng: &mut oorandom::Rand32) -> (String, Expected) {
    let len = rng.rand_range(1..5) as usize;
    match rng.rand_range(0..3) {
        0 => {
            let items: Vec<i64> = (0..len).map(|_| rng.rand_i32() as i64).collect();
            let text: Vec<String> = items.iter().map(|i| i.to_string()).collect();
            (format!("[{}]", text.join(", ")), Expected::Ints(items))
        }
        1 => {
            let items: Vec<f64> = (0..len)
                .map(|_| rng.rand_range(0..100_000) as f64 / 8.0)
                .collect();
            let text: Vec<String> = items.iter().map(|f| format!("{f:?}")).collect();
            (format!("[{}]", text.join(",")), Expected::Dbls(items))
        }
        _ => {
            let items: Vec<String> = (0..len)
                .map(|_| format!("s{}", rng.rand_range(0..1000)))
                .collect();
            let text: Vec<String> = items.iter().map(|s| format!("\"{s}\"")).collect();
            (format!("[ {} ]", text.join(" , ")), Expected::Strs(items))
        }
    }
}

/// Generates a document and the entries it must produce, tracking scopes
/// and last-write-wins by hand.
fn generate(rng: &mut oorandom::Rand32, lines: usize) -> (String, HashMap<String, Expected>) {
    let mut doc = String::new();
    let mut scope: Vec<&str> = Vec::new();
    let mut expected = HashMap::new();
    for _ in 0..lines {
        match rng.rand_range(0..10) {
            0 | 1 if scope.len() < 4 => {
                let segment = SEGMENTS[rng.rand_range(0..SEGMENTS.len() as u32) as usize];
                doc.push_str(&format!("{segment} {{\n"));
                scope.push(segment);
            }
            2 if !scope.is_empty() => {
                doc.push_str("}\n");
                scope.pop();
            }
            3 => doc.push_str("// a comment line\n"),
            _ => {
                let key = SEGMENTS[rng.rand_range(0..SEGMENTS.len() as u32) as usize];
                let (text, value) = random_value(rng);
                doc.push_str(&format!("{key} = {text} // trailing\n"));
                let mut full = scope.join(".");
                if !full.is_empty() {
                    full.push('.');
                }
                full.push_str(key);
                expected.insert(full, value);
            }
        }
    }
    (doc, expected)
}

#[test]
fn randomized_documents_match_model() {
    let mut rng = oorandom::Rand32::new(0x5eed);
    let iterations = if cfg!(miri) { 10 } else { 300 };
    for i in 0..iterations {
        let (doc, expected) = generate(&mut rng, 60);
        let buckets = 1 + (i % 40) as u32;
        let store = Options::new()
            .buckets(buckets)
            .parse(&doc)
            .unwrap_or_else(|e| panic!("generated document failed: {e}\n{doc}"));

        assert_eq!(store.len(), expected.len(), "{doc}");
        for (name, value) in &expected {
            let got = store.get(name).unwrap_or_else(|| panic!("missing {name}\n{doc}"));
            let actual = match got.kind() {
                Kind::Integer => Expected::Ints(got.as_integers().unwrap().to_vec()),
                Kind::Double => Expected::Dbls(got.as_doubles().unwrap().to_vec()),
                Kind::String => Expected::Strs(
                    got.as_strings()
                        .unwrap()
                        .iter()
                        .map(|t| t.to_string())
                        .collect(),
                ),
            };
            assert_eq!(&actual, value, "entry {name}");
        }
    }
}

#[test]
fn many_keys_in_few_buckets() {
    let mut doc = String::new();
    for i in 0..5000 {
        doc.push_str(&format!("group{} {{ key{i} = {i} }}\n", i % 7));
    }
    let store = Options::new().buckets(3).parse(&doc).unwrap();
    assert_eq!(store.len(), 5000);
    for i in (0..5000).step_by(97) {
        let name = format!("group{}.key{i}", i % 7);
        assert_eq!(store.get_integer(&name), Some(&[i as i64][..]));
    }
    let order: Vec<&str> = store.entries().take(3).map(|(name, _)| name).collect();
    assert_eq!(order, ["group0.key0", "group1.key1", "group2.key2"]);
}
