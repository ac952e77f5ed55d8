//! Hand-authored quizzes served when no generated quiz is available.
//!
//! Selection is an ordered table of rules keyed on the spot name. The last
//! rule always matches, so every spot name resolves to exactly one quiz.

use crate::quiz::{Difficulty, Quiz};

const PLACEHOLDER_SPOT: &str = "この場所";

/// A single catalog entry: a predicate over the spot name and the quiz it yields.
pub struct FallbackRule {
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
    build: fn(&str, u32) -> Quiz,
}

pub static FALLBACK_RULES: &[FallbackRule] = &[
    FallbackRule {
        name: "great_buddha",
        matches: is_great_buddha,
        build: great_buddha_quiz,
    },
    FallbackRule {
        name: "hachimangu",
        matches: is_hachimangu,
        build: hachimangu_quiz,
    },
    FallbackRule {
        name: "generic",
        matches: always,
        build: generic_quiz,
    },
];

fn is_great_buddha(spot: &str) -> bool {
    spot.contains("大仏")
}

fn is_hachimangu(spot: &str) -> bool {
    spot.contains("八幡宮")
}

fn always(_: &str) -> bool {
    true
}

/// Returns the catalog quiz for `spot_name`, scored by the `difficulty` label.
pub fn fallback_quiz(spot_name: &str, difficulty: &str) -> Quiz {
    fallback_quiz_for(spot_name, Difficulty::from_label(difficulty).points())
}

/// Same as [`fallback_quiz`] with the points already resolved.
pub fn fallback_quiz_for(spot_name: &str, points: u32) -> Quiz {
    let rule = select_rule(spot_name);
    (rule.build)(display_name(spot_name), points)
}

/// Name of the rule that [`fallback_quiz`] would use.
pub fn fallback_rule_name(spot_name: &str) -> &'static str {
    select_rule(spot_name).name
}

fn select_rule(spot_name: &str) -> &'static FallbackRule {
    FALLBACK_RULES
        .iter()
        .find(|rule| (rule.matches)(spot_name))
        .unwrap_or(&FALLBACK_RULES[FALLBACK_RULES.len() - 1])
}

fn display_name(spot_name: &str) -> &str {
    if spot_name.trim().is_empty() {
        PLACEHOLDER_SPOT
    } else {
        spot_name
    }
}

fn owned(options: [&str; 4]) -> Vec<String> {
    options.iter().map(|option| option.to_string()).collect()
}

fn great_buddha_quiz(spot: &str, points: u32) -> Quiz {
    Quiz {
        question: format!("{spot}について正しいものはどれでしょう？"),
        options: owned([
            "13世紀に建立された国宝である",
            "最近作られたレプリカである",
            "海外から輸入された仏像である",
            "実際には存在しない伝説上の仏像である",
        ]),
        correct_answer: 0,
        explanation: format!("{spot}は鎌倉時代に建立された、日本を代表する文化財です。"),
        points,
    }
}

fn hachimangu_quiz(spot: &str, points: u32) -> Quiz {
    Quiz {
        question: format!("{spot}と関係が深い人物は誰でしょう？"),
        options: owned(["源頼朝", "織田信長", "豊臣秀吉", "徳川家康"]),
        correct_answer: 0,
        explanation: format!("{spot}は源頼朝によって鎌倉幕府の守護神として崇敬されました。"),
        points,
    }
}

fn generic_quiz(spot: &str, points: u32) -> Quiz {
    Quiz {
        question: format!("{spot}について正しいものはどれでしょう？"),
        options: owned([
            "歴史的に重要な場所である",
            "最近建設された観光地である",
            "架空の場所である",
            "海外にある場所である",
        ]),
        correct_answer: 0,
        explanation: format!("{spot}は長い歴史を持つ重要な文化遺産です。"),
        points,
    }
}
