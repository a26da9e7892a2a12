//! Prompt templates for the exploration LLM calls.
//!
//! Placeholders use `{name}` and are filled with `str::replace`; no
//! templating engine. Every prompt instructs the model on the exact output
//! shape; `complete_json` parses list outputs.

pub const CHOICES_SYSTEM: &str = "You generate future-society issues for a school career \
exploration questionnaire. You always answer with a JSON array of strings and nothing else.";

pub const CHOICES_PROMPT_TEMPLATE: &str = r#"Student profile:
{student_context}

Generate exactly 5 future-society issues or problems this student would plausibly care
about, personalized to their interests, strengths, and values above. Each issue is one
short sentence a {band}-school student can understand.

{avoid_block}

Return a JSON array of 5 strings. No numbering, no markdown, no commentary."#;

pub const AVOID_BLOCK_TEMPLATE: &str = r#"Do NOT repeat or closely paraphrase any of these
previously shown issues:
{previous_choices}"#;

pub const RECOMMENDATION_SYSTEM: &str = "You are a warm career counselor for students. \
You answer with exactly one sentence and nothing else.";

pub const RECOMMENDATION_PROMPT_TEMPLATE: &str = r#"Student profile:
{student_context}

Propose one final career dream for this student as a single sentence, in one of these
shapes:
  A: "An expert in [field/role] who solves [problem/value]"
  B: "A [job] who makes [content/tool] so that [audience] feels [value]"

Keep it concrete, realistic for a {band}-school student to grow toward, and grounded in
the profile above.{modification_block}"#;

pub const MODIFICATION_BLOCK_TEMPLATE: &str = r#"

The student asked for this change to the previous proposal — honor it:
{modification_request}"#;

pub const REGENERATE_SUFFIX: &str = r#"

Important: propose a dream clearly different from earlier proposals. Consider a
different field or angle."#;

pub const PLAN_SYSTEM: &str = "You write encouraging, concrete action plans for students. \
Plain text only, no markdown headers.";

pub const PLAN_PROMPT_TEMPLATE: &str = r#"Student profile:
{student_context}

Confirmed final dream: {final_goal}

Write the student's "dream logic" action plan with exactly three mid-goals. For each
mid-goal give:
- the mid-goal title and why it matters for the dream
- school actions (subjects, clubs, projects)
- daily-life actions (routines, habits)
- one recommended outside activity

Close with a two-line encouragement memo addressed to {student_name} that names one of
their strengths. Keep everything realistic for a {band}-school student."#;
