//! Date rewriting lands on the target date whatever the source date was.

use chrono::NaiveDate;
use proptest::prelude::*;
use shift_automator::host::{Story, StoryKind};
use shift_automator::session::substitution::{plan, SubstitutionPlan, SubstitutionScope};

fn any_date() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2060, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn render(date: NaiveDate) -> String {
    format!(
        "{} | posted {} | filed {}",
        date.format("%A, %B %d, %Y"),
        date.format("%m/%d/%Y"),
        date.format("%Y-%m-%d")
    )
}

fn apply(plan: &SubstitutionPlan, story: usize, text: &str) -> String {
    plan.normalise
        .iter()
        .chain(plan.edits.iter())
        .filter(|edit| edit.story == story)
        .fold(text.to_string(), |out, edit| out.replace(&edit.find, &edit.replace))
}

proptest! {
    #[test]
    fn rewritten_story_reads_as_the_target_date(source in any_date(), target in any_date()) {
        let story = Story { id: 0, kind: StoryKind::MainText, text: render(source) };
        let edits = plan(std::slice::from_ref(&story), target, SubstitutionScope::AllStories);

        prop_assert_eq!(edits.matches, 3);
        prop_assert_eq!(apply(&edits, 0, &story.text), render(target));
    }

    #[test]
    fn out_of_scope_stories_are_never_edited(source in any_date(), target in any_date()) {
        let body = Story { id: 0, kind: StoryKind::MainText, text: render(source) };
        let edits = plan(std::slice::from_ref(&body), target, SubstitutionScope::HeadersFootersOnly);
        prop_assert!(edits.is_empty());
        prop_assert_eq!(apply(&edits, 0, &body.text), body.text);
    }
}
