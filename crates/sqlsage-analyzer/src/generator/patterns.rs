//! Intent pattern table
//!
//! Each entry pairs a regex over the normalized intent text with the clause
//! builder it drives. Entries run in priority order and a match is skipped
//! when it overlaps text an earlier match already claimed. A builder returns
//! the end of the text it used, or `None` to leave the text unclaimed.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::draft::Draft;

type Builder = fn(&Captures<'_>, &mut Draft<'_>) -> Option<usize>;

pub struct IntentPattern {
    pub name: &'static str,
    pub regex: Regex,
    pub build: Builder,
}

fn pattern(name: &'static str, regex: &str, build: Builder) -> IntentPattern {
    IntentPattern {
        name,
        regex: Regex::new(regex).expect("valid intent pattern"),
        build,
    }
}

/// Lowercase word, optionally followed by a second one (`created at`)
const PHRASE: &str = r"[a-z_][a-z0-9_]*(?:\s[a-z_][a-z0-9_]*)?";
const WORD: &str = r"[a-z_][a-z0-9_]*";
const VALUE: &str = r"'(?:[^']|'')*'|-?\d+(?:\.\d+)?|[a-z_][a-z0-9_]*";

/// How a comparison phrase renders in SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Comparator {
    phrase: &'static str,
    sql: &'static str,
    /// `LIKE` pattern wrapped around the value
    wildcard: Option<(&'static str, &'static str)>,
}

const fn cmp(phrase: &'static str, sql: &'static str) -> Comparator {
    Comparator {
        phrase,
        sql,
        wildcard: None,
    }
}

const fn like(phrase: &'static str, prefix: &'static str, suffix: &'static str) -> Comparator {
    Comparator {
        phrase,
        sql: "LIKE",
        wildcard: Some((prefix, suffix)),
    }
}

/// Longer phrases first: the regex alternation prefers earlier entries
const COMPARATORS: &[Comparator] = &[
    cmp("is not equal to", "<>"),
    cmp("not equal to", "<>"),
    cmp("is equal to", "="),
    cmp("equal to", "="),
    cmp("equals", "="),
    cmp("equal", "="),
    cmp("is greater than", ">"),
    cmp("greater than", ">"),
    cmp("is more than", ">"),
    cmp("more than", ">"),
    cmp("is higher than", ">"),
    cmp("higher than", ">"),
    cmp("is above", ">"),
    cmp("above", ">"),
    cmp("over", ">"),
    cmp("exceeds", ">"),
    cmp("is less than", "<"),
    cmp("less than", "<"),
    cmp("fewer than", "<"),
    cmp("is lower than", "<"),
    cmp("lower than", "<"),
    cmp("is below", "<"),
    cmp("below", "<"),
    cmp("under", "<"),
    cmp("is at least", ">="),
    cmp("at least", ">="),
    cmp("is at most", "<="),
    cmp("at most", "<="),
    cmp("not like", "NOT LIKE"),
    cmp("like", "LIKE"),
    like("contains", "%", "%"),
    like("containing", "%", "%"),
    like("includes", "%", "%"),
    like("starts with", "", "%"),
    like("starting with", "", "%"),
    like("begins with", "", "%"),
    like("ends with", "%", ""),
    like("ending with", "%", ""),
    cmp("is not", "<>"),
    cmp("not", "<>"),
    cmp("is", "="),
    cmp(">=", ">="),
    cmp("<=", "<="),
    cmp("<>", "<>"),
    cmp("!=", "<>"),
    cmp("=", "="),
    cmp(">", ">"),
    cmp("<", "<"),
];

fn comparator(phrase: &str) -> Option<&'static Comparator> {
    COMPARATORS.iter().find(|c| c.phrase == phrase)
}

fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl Comparator {
    fn render(&self, column: &str, value: &str) -> Option<String> {
        let quoted = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\''));
        let is_number = quoted.is_none()
            && value.starts_with(|c: char| c.is_ascii_digit() || c == '-')
            && value.parse::<f64>().is_ok();
        let unescaped = quoted.map(|q| q.replace("''", "'"));
        let raw = unescaped.as_deref().unwrap_or(value);

        if let Some((prefix, suffix)) = self.wildcard {
            return Some(format!(
                "{column} LIKE {}",
                string_literal(&format!("{prefix}{raw}{suffix}"))
            ));
        }
        if quoted.is_none() {
            match (value, self.sql) {
                ("null", "=") => return Some(format!("{column} IS NULL")),
                ("null", "<>") => return Some(format!("{column} IS NOT NULL")),
                ("null", _) => return None,
                ("true" | "false", _) => {
                    return Some(format!("{column} {} {}", self.sql, value.to_uppercase()));
                }
                _ => {}
            }
        }
        let rendered = if is_number {
            value.to_string()
        } else {
            string_literal(raw)
        };
        Some(format!("{column} {} {rendered}", self.sql))
    }
}

pub static PATTERNS: LazyLock<Vec<IntentPattern>> = LazyLock::new(|| {
    let operators: Vec<String> = COMPARATORS.iter().map(|c| regex::escape(c.phrase)).collect();
    vec![
        pattern(
            "limit",
            r"\b(?P<kw>top|first|bottom)\s+(?P<n>\d+)\b",
            build_limit,
        ),
        pattern(
            "ranked-limit",
            &format!(r"\b(?P<n>\d+)\s+(?P<word>{WORD})\b"),
            build_ranked_limit,
        ),
        pattern(
            "count",
            r"\b(?:count(?:\s+of)?|how\s+many|number\s+of)\b",
            build_count,
        ),
        pattern(
            "aggregate",
            &format!(
                r"\b(?P<func>average|avg|mean|total|sum)\s+(?:of\s+)?(?:the\s+)?(?P<col>{PHRASE})"
            ),
            build_aggregate,
        ),
        pattern(
            "condition",
            &format!(
                r"\b(?:where|with|whose|having|and)\s+(?:(?:the|a|an)\s+)?(?P<col>{PHRASE})\s+(?P<op>{})\s+(?P<value>{VALUE})",
                operators.join("|")
            ),
            build_condition,
        ),
        pattern(
            "group",
            &format!(
                r"\b(?P<kw>group(?:ed)?\s+by|per|for\s+each|by)\s+(?:(?:the|each)\s+)?(?P<col>{PHRASE})"
            ),
            build_group,
        ),
        pattern(
            "sort",
            &format!(
                r"\b(?:sorted|ordered|sort|order)\s+by\s+(?:the\s+)?(?P<col>{PHRASE})(?:\s+(?P<dir>asc|ascending|desc|descending)\b)?"
            ),
            build_sort,
        ),
        pattern(
            "distinct",
            &format!(r"\b(?:distinct|unique|different)\s+(?P<col>{PHRASE})"),
            build_distinct,
        ),
    ]
});

/// End offset of the part of a phrase capture that resolved to a column
fn phrase_end(caps: &Captures<'_>, used: usize) -> Option<usize> {
    caps.name("col").map(|m| m.start() + used)
}

/// `top 5`, `first 10`, `bottom 3`
fn build_limit(caps: &Captures<'_>, draft: &mut Draft<'_>) -> Option<usize> {
    if draft.limit.is_some() {
        return None;
    }
    draft.limit = Some(caps.name("n")?.as_str().parse().ok()?);
    if matches!(caps.name("kw")?.as_str(), "first" | "bottom") {
        draft.limit_descending = Some(false);
    }
    caps.get(0).map(|m| m.end())
}

/// `5 most`, `3 lowest`, `10 newest`. The word may also name the metric.
fn build_ranked_limit(caps: &Captures<'_>, draft: &mut Draft<'_>) -> Option<usize> {
    let word = caps.name("word")?.as_str();
    let vocabulary = draft.matcher.vocabulary;
    let descending = vocabulary.direction(word)?;
    if draft.limit.is_some() {
        return None;
    }
    draft.limit = Some(caps.name("n")?.as_str().parse().ok()?);
    draft.limit_descending = Some(descending);
    if vocabulary.canonical(word) != word && draft.order_by.is_none() {
        if let Some((column, _)) = draft.resolve(word) {
            draft.order_by = Some(column);
        }
    }
    caps.get(0).map(|m| m.end())
}

fn build_count(caps: &Captures<'_>, draft: &mut Draft<'_>) -> Option<usize> {
    if !draft.aggregates.iter().any(|a| a == "COUNT(*)") {
        draft.aggregates.push("COUNT(*)".to_string());
    }
    caps.get(0).map(|m| m.end())
}

/// `average salary`, `total of the amount`
fn build_aggregate(caps: &Captures<'_>, draft: &mut Draft<'_>) -> Option<usize> {
    let function = match caps.name("func")?.as_str() {
        "average" | "avg" | "mean" => "AVG",
        _ => "SUM",
    };
    let (column, used) = draft.resolve(caps.name("col")?.as_str())?;
    let aggregate = format!("{function}({column})");
    if !draft.aggregates.contains(&aggregate) {
        draft.aggregates.push(aggregate);
    }
    phrase_end(caps, used)
}

/// `where total > 100`, `whose name contains 'phone'`, `and status is paid`
fn build_condition(caps: &Captures<'_>, draft: &mut Draft<'_>) -> Option<usize> {
    let phrase = caps.name("col")?.as_str();
    let op = caps.name("op")?.as_str();
    let value = caps.name("value")?.as_str();
    let Some((column, _)) = draft.resolve(phrase) else {
        if !draft.matcher.vocabulary.is_stop_word(phrase) {
            draft.note_ignored(format!(
                "Could not match \"{phrase}\" to a column; the condition \"{phrase} {op} {value}\" was ignored"
            ));
        }
        return None;
    };
    let condition = comparator(op)?.render(&column, value)?;
    if !draft.conditions.contains(&condition) {
        draft.conditions.push(condition);
    }
    caps.get(0).map(|m| m.end())
}

/// `per country`, `for each status`, `grouped by team`. A bare `by` only
/// groups when an aggregate was asked for; otherwise it names the sort column
/// (`top 5 users by spend`).
fn build_group(caps: &Captures<'_>, draft: &mut Draft<'_>) -> Option<usize> {
    let whole = caps.get(0)?;
    let keyword = caps.name("kw")?.as_str();
    if keyword == "by" {
        let before = draft.intent.text[..whole.start()].trim_end();
        if ["sorted", "ordered", "sort", "order"]
            .iter()
            .any(|w| before.ends_with(w))
        {
            return None;
        }
    }
    let (column, used) = draft.resolve(caps.name("col")?.as_str())?;
    if keyword == "by" && draft.aggregates.is_empty() {
        if draft.order_by.is_some() {
            return None;
        }
        draft.order_by = Some(column);
    } else if !draft.group_by.contains(&column) {
        draft.group_by.push(column);
    }
    phrase_end(caps, used)
}

/// `sorted by name`, `ordered by created at desc`
fn build_sort(caps: &Captures<'_>, draft: &mut Draft<'_>) -> Option<usize> {
    let phrase = caps.name("col")?;
    let (column, used) = draft.resolve(phrase.as_str())?;
    draft.order_by = Some(column);
    match caps.name("dir") {
        // the direction only counts when the whole phrase was the column
        Some(dir) if used == phrase.len() => {
            draft.order_descending = Some(dir.as_str().starts_with("desc"));
            Some(dir.end())
        }
        _ => phrase_end(caps, used),
    }
}

/// `distinct cities`, `unique emails`
fn build_distinct(caps: &Captures<'_>, draft: &mut Draft<'_>) -> Option<usize> {
    let (column, used) = draft.resolve(caps.name("col")?.as_str())?;
    draft.distinct = Some(column);
    phrase_end(caps, used)
}
