//! URL templates, rendered against the automation snapshot.

use minijinja::Environment;

use commander_domain::automation::Automation;

pub(crate) fn check(source: &str) -> Result<(), minijinja::Error> {
    Environment::new().template_from_str(source).map(|_| ())
}

pub(crate) fn render(source: &str, automation: &Automation) -> Result<String, minijinja::Error> {
    let env = Environment::new();
    env.template_from_str(source)?.render(automation)
}

#[cfg(test)]
mod tests {
    use commander_domain::automation::{AutomationDefinition, ConstraintSpec};
    use commander_domain::id::AutomationId;
    use commander_domain::value::Value;

    use super::*;

    fn automation(value: Value) -> Automation {
        let definition = AutomationDefinition::builder()
            .name("Hall light")
            .constraint(ConstraintSpec::mqtt("hall/motion"))
            .build()
            .unwrap();
        let mut automation =
            Automation::from_definition(AutomationId::from_raw(1), &definition, "hall.yml");
        automation.value = Some(value);
        automation
    }

    #[test]
    fn should_render_whole_value_without_fraction() {
        let url = render(
            "http://hub/level/{{ value }}",
            &automation(Value::Number(42.0)),
        )
        .unwrap();
        assert_eq!(url, "http://hub/level/42");
    }

    #[test]
    fn should_render_fractional_value() {
        let url = render("http://hub/temp/{{ value }}", &automation(Value::Number(21.5))).unwrap();
        assert_eq!(url, "http://hub/temp/21.5");
    }
}
