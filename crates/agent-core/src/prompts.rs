//! Prompt text for the three collaborator roles.

use crate::model::PlanStep;

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a precise browser automation agent that interacts with websites through structured commands. Your role is to:
1. Analyze the provided webpage screenshot and the list of interactive elements
2. Work out whether the user's request needs more than one step
3. Pick the most appropriate actions to complete the request
4. Respond with valid JSON that matches the requested schema

Actions:
- click: click an interactive element by index
- fill: type a value into a form field by index
- search_google: search Google in the current tab
- go_to_url: navigate to a URL
- go_back: go back in history
- scroll_down / scroll_up: scroll the page, optionally by an amount in pixels
- send_keys: send keyboard input to the focused element
- extract_content: read the page as text, markdown or html
- done: mark the task as complete and give the final answer

Interactive elements are listed one per line as:
  index[:]<tag attributes>text</tag>
Lines starting with _[:] are context only and cannot be targeted.
Only use indexes that appear in the current list; indexes change after every action."#;

pub fn planner_prompt(task: &str) -> String {
    format!(
        "Task: \"{task}\". Break the task into an ordered action_plan. Each step has a type \
         (action or checkpoint), a description, success_criteria that can be checked from the \
         page, and a confidence_level between 0 and 1. Use a checkpoint when the next steps \
         depend on what the page shows after the previous ones."
    )
}

/// Planner request issued at a checkpoint, after `done` steps have run.
pub fn replan_prompt(task: &str, done: &[PlanStep]) -> String {
    let mut prompt = planner_prompt(task);
    if !done.is_empty() {
        let finished: Vec<&str> = done.iter().map(|step| step.description.as_str()).collect();
        prompt.push_str(&format!(
            " Already completed: {}. Plan only the remaining steps from the current page.",
            finished.join("; ")
        ));
    }
    prompt
}

/// `previous` carries the evaluator's reason and the action results of a
/// failed attempt at the same step.
pub fn executor_prompt(task: &str, step: &PlanStep, previous: Option<(&str, &str)>) -> String {
    let mut prompt = format!(
        "Task: \"{task}\". Current step: \"{}\".",
        step.description
    );
    if !step.success_criteria.is_empty() {
        prompt.push_str(&format!(" The step succeeds when: {}.", step.success_criteria));
    }
    if let Some((reason, actions)) = previous {
        prompt.push_str(&format!(" The previous attempt failed: {reason}."));
        if !actions.is_empty() {
            prompt.push_str(&format!(" Its action results: {actions}."));
        }
        prompt.push_str(" Adjust the actions to resolve the issue.");
    }
    prompt.push_str(" Return the actions for this step only.");
    prompt
}

/// Asks for a verdict on the step that just ran.
pub fn evaluator_prompt(step: &PlanStep, batch_summary: &str) -> String {
    let mut prompt = format!(
        "Executed task: \"{}\". Evaluate the screenshot and see if it looks correct. No popups \
         open or autocomplete selections that need to be dealt with.",
        step.description
    );
    if !step.success_criteria.is_empty() {
        prompt.push_str(&format!(" Success criteria: {}.", step.success_criteria));
    }
    if !batch_summary.is_empty() {
        prompt.push_str(&format!(" Action results: {batch_summary}."));
    }
    prompt
}

/// Body of the user turn sent with a request: the prompt followed by the
/// element list when one is attached.
pub fn user_message(prompt: &str, elements: Option<&str>) -> String {
    match elements {
        Some(list) if !list.is_empty() => format!("{prompt}\n\nInteractive elements:\n{list}"),
        _ => prompt.to_string(),
    }
}
