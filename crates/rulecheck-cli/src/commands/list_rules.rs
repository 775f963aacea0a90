//! List rules command implementation.

use rulecheck_rules::builtin_catalog;

/// Runs the list-rules command.
pub fn run() {
    println!("Available rules:\n");
    println!("{:<30} Description", "Identifier");
    println!("{}", "-".repeat(80));

    for (name, description) in builtin_catalog().iter() {
        println!("{name:<30} {description}");
    }

    println!("\nEnable rules in a rule-set config, e.g. rulecheck.json:");
    println!(r#"  {{ "rules": [{{ "name": "builtin.find_word", "settings": {{ "word": "goto" }} }}] }}"#);
    println!("\nRules can also be loaded from pattern files found under --rulepaths:");
    println!("  a rule named team.no_goto is read from <rulepath>/team/no_goto.toml");
}
