use crate::domain::step::Step;

/// Build the step list that results from appending `subflow`.
///
/// The first `static_count` steps of `current` are kept and every
/// previously spliced step is dropped, so recomputing the same sub-flow
/// always yields the same list.
pub fn splice_steps<C>(current: &[Step<C>], static_count: usize, subflow: Vec<Step<C>>) -> Vec<Step<C>> {
    let keep = static_count.min(current.len());
    let mut steps = Vec::with_capacity(keep + subflow.len());
    steps.extend(current[..keep].iter().cloned());
    steps.extend(subflow);
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn titles(steps: &[Step<()>]) -> Vec<String> {
        steps.iter().map(|s| s.title.clone()).collect()
    }

    fn step(title: &str) -> Step<()> {
        Step::new(title, format!("{}-form", title))
    }

    #[test]
    fn test_splice_appends_after_static_steps() {
        let current = vec![step("source")];
        let spliced = splice_steps(&current, 1, vec![step("repo"), step("deploy")]);
        assert_eq!(titles(&spliced), vec!["source", "repo", "deploy"]);
    }

    #[test]
    fn test_splice_replaces_previous_subflow() {
        let current = vec![step("source"), step("repo"), step("notify"), step("deploy")];
        let spliced = splice_steps(&current, 1, vec![step("repo"), step("deploy")]);
        assert_eq!(titles(&spliced), vec!["source", "repo", "deploy"]);
    }

    #[test]
    fn test_splice_is_idempotent() {
        let current = vec![step("source")];
        let subflow = || vec![step("repo"), step("details"), step("deploy")];

        let once = splice_steps(&current, 1, subflow());
        let twice = splice_steps(&once, 1, subflow());
        assert_eq!(titles(&once), titles(&twice));
    }

    #[test]
    fn test_static_count_larger_than_list() {
        let current = vec![step("only")];
        let spliced = splice_steps(&current, 5, vec![step("next")]);
        assert_eq!(titles(&spliced), vec!["only", "next"]);
    }
}
