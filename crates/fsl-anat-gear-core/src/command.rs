//! Command-line assembly from the flag dictionary.

use crate::{FlagMap, FlagValue};

/// Build the full argv for `program` from the flag dictionary.
pub fn build_command_list(program: &str, params: &FlagMap) -> Vec<String> {
    let mut command = vec![program.to_string()];
    append_flags(&mut command, params);
    command
}

/// Append flag tokens in dictionary order.
///
/// - single-character keys: `-k value`, or bare `-k` for a true boolean or an
///   empty value;
/// - longer keys: `--key` for a true boolean or an empty value, otherwise
///   `--key=value`. False booleans emit nothing.
pub fn append_flags(command: &mut Vec<String>, params: &FlagMap) {
    for (key, value) in params.iter() {
        if let FlagValue::Bool(enabled) = value {
            if !enabled {
                continue;
            }
            command.push(flag_name(key));
            continue;
        }
        let rendered = value.to_string();
        if key.chars().count() == 1 {
            command.push(format!("-{key}"));
            if !rendered.is_empty() {
                command.push(rendered);
            }
        } else if rendered.is_empty() {
            command.push(format!("--{key}"));
        } else {
            command.push(format!("--{key}={rendered}"));
        }
    }
}

fn flag_name(key: &str) -> String {
    if key.chars().count() == 1 {
        format!("-{key}")
    } else {
        format!("--{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::build_command_list;
    use crate::{FlagMap, FlagValue};
    use pretty_assertions::assert_eq;
    use serde_json::Number;

    fn tokens(params: &FlagMap) -> Vec<String> {
        build_command_list("fsl_anat", params)
    }

    #[test]
    fn explicit_zero_short_flag_is_emitted() {
        let params: FlagMap = [("s", FlagValue::from(0_i64))].into_iter().collect();
        assert_eq!(tokens(&params), vec!["fsl_anat", "-s", "0"]);
    }

    #[test]
    fn long_flags_use_equals_or_bare_forms() {
        let params: FlagMap = [
            ("nononlinreg", FlagValue::Bool(true)),
            ("noseg", FlagValue::Bool(false)),
            (
                "betfparam",
                FlagValue::Number(Number::from_f64(0.5).expect("finite")),
            ),
            ("bias_label", FlagValue::from("")),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            tokens(&params),
            vec!["fsl_anat", "--nononlinreg", "--betfparam=0.5", "--bias_label"]
        );
    }

    #[test]
    fn short_flags_without_value() {
        let params: FlagMap = [("d", FlagValue::from("")), ("v", FlagValue::Bool(true))]
            .into_iter()
            .collect();
        assert_eq!(tokens(&params), vec!["fsl_anat", "-d", "-v"]);
    }

    #[test]
    fn order_follows_dictionary() {
        let params: FlagMap = [
            ("i", FlagValue::from("/in/t1.nii.gz")),
            ("t", FlagValue::from("T1")),
            ("strongbias", FlagValue::Bool(true)),
            ("s", FlagValue::from(10_i64)),
            ("o", FlagValue::from("/work/t1_result")),
        ]
        .into_iter()
        .collect();
        let expected = vec![
            "fsl_anat",
            "-i",
            "/in/t1.nii.gz",
            "-t",
            "T1",
            "--strongbias",
            "-s",
            "10",
            "-o",
            "/work/t1_result",
        ];
        assert_eq!(tokens(&params), expected);
        assert_eq!(tokens(&params), tokens(&params.clone()));
    }
}
