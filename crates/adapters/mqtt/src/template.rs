//! Action value templates, rendered against the automation snapshot.

use minijinja::Environment;

use commander_domain::automation::Automation;

pub(crate) fn check(source: &str) -> Result<(), minijinja::Error> {
    Environment::new().template_from_str(source).map(|_| ())
}

pub(crate) fn render(source: &str, automation: &Automation) -> Result<String, minijinja::Error> {
    let env = Environment::new();
    env.template_from_str(source)?.render(automation)
}
