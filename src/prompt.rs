//! The line format the provider is asked to answer in.
//!
//! The markers are shared with [`crate::parser`], which scans for exactly
//! these prefixes.

pub const QUESTION_MARKER: &str = "問題:";
pub const OPTION_MARKERS: [&str; 4] = ["1.", "2.", "3.", "4."];
pub const ANSWER_MARKER: &str = "正解:";
pub const EXPLANATION_MARKER: &str = "解説:";

/// Builds the single-question prompt for `spot_name`.
///
/// `difficulty` is echoed as given; `spot_description` is included as context
/// even when empty.
pub fn build_prompt(spot_name: &str, difficulty: &str, spot_description: &str) -> String {
    let mut prompt = format!(
        "{spot_name}について{difficulty}レベルのクイズを1問作成してください。\n\n\
         スポット情報: {spot_description}\n\n\
         以下の形式で回答:\n\
         {QUESTION_MARKER} [4択問題文]\n"
    );
    for (index, marker) in OPTION_MARKERS.iter().enumerate() {
        prompt.push_str(&format!("{marker} [選択肢{}]\n", index + 1));
    }
    prompt.push_str(&format!("{ANSWER_MARKER} [1-4の数字]\n"));
    prompt.push_str(&format!("{EXPLANATION_MARKER} [簡潔な解説文]"));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_spot_level_and_context() {
        let prompt = build_prompt("鎌倉大仏", "中学生", "高徳院の本尊");
        assert!(prompt.starts_with("鎌倉大仏について中学生レベルのクイズを1問作成してください。"));
        assert!(prompt.contains("スポット情報: 高徳院の本尊"));
    }

    #[test]
    fn prompt_lists_every_marker_on_its_own_line() {
        let prompt = build_prompt("江ノ島", "high", "");
        let lines: Vec<&str> = prompt.lines().collect();
        assert!(lines.iter().any(|line| line.starts_with(QUESTION_MARKER)));
        for marker in OPTION_MARKERS {
            assert!(lines.iter().any(|line| line.starts_with(marker)), "{marker}");
        }
        assert!(lines.iter().any(|line| line.starts_with(ANSWER_MARKER)));
        assert_eq!(lines.last(), Some(&"解説: [簡潔な解説文]"));
        assert!(!prompt.ends_with('\n'));
    }
}
