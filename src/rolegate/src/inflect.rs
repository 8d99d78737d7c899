//! English inflection for resource names
//!
//! Entity type names (`ServerItem`) map to resource names (`server_items`)
//! the way database tables are named. Only ASCII identifiers are inflected;
//! anything else is returned with a plain `s` rule applied.

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "jeans",
    "police",
    "news",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("child", "children"),
    ("sex", "sexes"),
    ("move", "moves"),
    ("zombie", "zombies"),
    ("ox", "oxen"),
];

/// A suffix rewrite: when the lowercased word ends with `suffix` (and the
/// optional guard accepts the character before it), drop `strip` bytes and
/// append `append`.
struct Rule {
    suffix: &'static str,
    guard: Option<fn(char) -> bool>,
    strip: usize,
    append: &'static str,
}

const fn rule(suffix: &'static str, strip: usize, append: &'static str) -> Rule {
    Rule {
        suffix,
        guard: None,
        strip,
        append,
    }
}

const fn guarded(
    suffix: &'static str,
    guard: fn(char) -> bool,
    strip: usize,
    append: &'static str,
) -> Rule {
    Rule {
        suffix,
        guard: Some(guard),
        strip,
        append,
    }
}

fn is_consonant(c: char) -> bool {
    !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

fn is_not_f(c: char) -> bool {
    c != 'f'
}

fn is_l_or_r(c: char) -> bool {
    c == 'l' || c == 'r'
}

fn is_t_or_i(c: char) -> bool {
    c == 't' || c == 'i'
}

// First match wins.
const PLURAL_RULES: &[Rule] = &[
    rule("quiz", 0, "zes"),
    rule("matrix", 2, "ices"),
    rule("vertex", 2, "ices"),
    rule("index", 2, "ices"),
    rule("octopus", 2, "i"),
    rule("virus", 2, "i"),
    rule("alias", 0, "es"),
    rule("status", 0, "es"),
    rule("bus", 0, "es"),
    rule("buffalo", 0, "es"),
    rule("tomato", 0, "es"),
    guarded("um", is_t_or_i, 2, "a"),
    rule("sis", 2, "es"),
    rule("hive", 0, "s"),
    guarded("fe", is_not_f, 2, "ves"),
    guarded("f", is_l_or_r, 1, "ves"),
    rule("quy", 1, "ies"),
    guarded("y", is_consonant, 1, "ies"),
    rule("x", 0, "es"),
    rule("ch", 0, "es"),
    rule("ss", 0, "es"),
    rule("sh", 0, "es"),
    rule("s", 0, ""),
];

const SINGULAR_RULES: &[Rule] = &[
    rule("quizzes", 3, ""),
    rule("matrices", 4, "ix"),
    rule("vertices", 4, "ex"),
    rule("indices", 4, "ex"),
    rule("octopi", 1, "us"),
    rule("viri", 1, "us"),
    rule("aliases", 2, ""),
    rule("statuses", 2, ""),
    rule("buses", 2, ""),
    rule("shoes", 1, ""),
    rule("oes", 2, ""),
    rule("xes", 2, ""),
    rule("ches", 2, ""),
    rule("sses", 2, ""),
    rule("shes", 2, ""),
    rule("movies", 1, ""),
    rule("quies", 3, "y"),
    guarded("ies", is_consonant, 3, "y"),
    guarded("ves", is_l_or_r, 3, "f"),
    rule("tives", 1, ""),
    rule("hives", 1, ""),
    guarded("ves", is_not_f, 3, "fe"),
    rule("analyses", 2, "is"),
    rule("bases", 2, "is"),
    rule("diagnoses", 2, "is"),
    rule("parentheses", 2, "is"),
    rule("prognoses", 2, "is"),
    rule("synopses", 2, "is"),
    rule("theses", 2, "is"),
    guarded("a", is_t_or_i, 1, "um"),
    rule("ss", 0, ""),
    rule("us", 0, ""),
    rule("is", 0, ""),
    rule("s", 1, ""),
];

fn apply(word: &str, rules: &[Rule], fallback: &str) -> String {
    let lower = word.to_ascii_lowercase();
    for rule in rules {
        if !lower.ends_with(rule.suffix) {
            continue;
        }
        if let Some(guard) = rule.guard {
            let before = lower[..lower.len() - rule.suffix.len()].chars().last();
            if !before.map(guard).unwrap_or(false) {
                continue;
            }
        }
        let mut out = word[..word.len() - rule.strip].to_string();
        out.push_str(rule.append);
        return out;
    }
    format!("{word}{fallback}")
}

/// Splits `name` into everything up to the last `_` and the final word.
fn split_last_word(name: &str) -> (&str, &str) {
    match name.rfind('_') {
        Some(idx) => (&name[..=idx], &name[idx + 1..]),
        None => ("", name),
    }
}

fn inflect_word(word: &str, plural: bool) -> String {
    let lower = word.to_ascii_lowercase();
    if lower.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    for (singular, plural_form) in IRREGULAR {
        let (from, to) = if plural {
            (singular, plural_form)
        } else {
            (plural_form, singular)
        };
        if lower == *from {
            let mut out = to.to_string();
            if word.starts_with(|c: char| c.is_ascii_uppercase()) {
                out[..1].make_ascii_uppercase();
            }
            return out;
        }
    }
    if !word.is_ascii() {
        return if plural {
            format!("{word}s")
        } else {
            word.to_string()
        };
    }
    if plural {
        apply(word, PLURAL_RULES, "s")
    } else {
        apply(word, SINGULAR_RULES, "")
    }
}

/// Plural form of a (possibly snake_case) name; only the last word changes.
pub fn pluralize(name: &str) -> String {
    let (head, last) = split_last_word(name);
    format!("{head}{}", inflect_word(last, true))
}

/// Singular form of a (possibly snake_case) name; only the last word changes.
pub fn singularize(name: &str) -> String {
    let (head, last) = split_last_word(name);
    format!("{head}{}", inflect_word(last, false))
}

/// True when `name` is already in plural form.
pub fn is_plural(name: &str) -> bool {
    singularize(name) != name
}

/// `ServerItem` → `server_item`, `HTTPServer` → `http_server`.
pub fn underscore(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' || c == ':' {
            if !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            if (prev.is_lowercase() || prev.is_ascii_digit())
                || (prev.is_uppercase() && next_is_lower)
            {
                if !out.ends_with('_') {
                    out.push('_');
                }
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Resource (table) name for an entity type name: `ServerItem` → `server_items`.
pub fn tableize(type_name: &str) -> String {
    pluralize(&underscore(type_name))
}
