//! Stage catalogs: the per-school-band questionnaire definitions.
//!
//! A catalog is pure data: question text, fixed choice lists, selection
//! bounds, and which stage (if any) gets its choices from the AI provider.
//! The engine is written once and instantiated with a catalog, so adding a
//! band means adding a table here, not another state machine.

use serde::{Deserialize, Serialize};

/// School band a catalog (and therefore an engine instance) is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchoolBand {
    Elementary,
    Middle,
    High,
}

impl SchoolBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchoolBand::Elementary => "elementary",
            SchoolBand::Middle => "middle",
            SchoolBand::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "elementary" => Some(SchoolBand::Elementary),
            "middle" => Some(SchoolBand::Middle),
            "high" => Some(SchoolBand::High),
            _ => None,
        }
    }

    /// Inclusive grade range accepted at the identity stage.
    pub fn grade_range(&self) -> (u8, u8) {
        match self {
            SchoolBand::Elementary => (5, 6),
            SchoolBand::Middle => (1, 3),
            SchoolBand::High => (1, 3),
        }
    }
}

/// What kind of behavior a stage has. Consumed at a single dispatch point in
/// the engine instead of scattered `if stage == X` checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Stage 0: capture name and grade. No choices.
    Identity,
    /// A questionnaire stage answered by selecting choice indices.
    Select,
    /// The propose/confirm loop over the AI recommendation.
    Recommendation,
    /// Terminal long-form plan stage.
    Plan,
}

/// Immutable definition of one stage.
#[derive(Debug, Clone)]
pub struct StageDefinition {
    pub id: usize,
    pub kind: StageKind,
    pub prompt_text: &'static str,
    /// Fixed options. For a dynamic stage this doubles as the fallback list
    /// used when the choice provider is unavailable.
    pub choice_set: &'static [&'static str],
    pub selection_min: usize,
    pub selection_max: usize,
    /// 1-based index of the "other, write your own" slot, if the stage has one.
    pub other_index: Option<usize>,
    /// Whether the live choice list comes from the DynamicChoiceProvider.
    pub is_dynamic: bool,
}

impl StageDefinition {
    fn identity(id: usize, prompt_text: &'static str) -> Self {
        StageDefinition {
            id,
            kind: StageKind::Identity,
            prompt_text,
            choice_set: &[],
            selection_min: 0,
            selection_max: 0,
            other_index: None,
            is_dynamic: false,
        }
    }

    fn select(
        id: usize,
        prompt_text: &'static str,
        choice_set: &'static [&'static str],
        selection_min: usize,
        selection_max: usize,
        is_dynamic: bool,
    ) -> Self {
        // The "other" slot is always the last fixed choice by convention.
        StageDefinition {
            id,
            kind: StageKind::Select,
            prompt_text,
            choice_set,
            selection_min,
            selection_max,
            other_index: Some(choice_set.len()),
            is_dynamic,
        }
    }

    fn recommendation(id: usize, prompt_text: &'static str) -> Self {
        StageDefinition {
            id,
            kind: StageKind::Recommendation,
            prompt_text,
            choice_set: &[],
            selection_min: 0,
            selection_max: 0,
            other_index: None,
            is_dynamic: false,
        }
    }

    fn plan(id: usize, prompt_text: &'static str) -> Self {
        StageDefinition {
            id,
            kind: StageKind::Plan,
            prompt_text,
            choice_set: &[],
            selection_min: 0,
            selection_max: 0,
            other_index: None,
            is_dynamic: false,
        }
    }
}

/// The live options a submission is validated against: either a stage's
/// static `choice_set` or the most recently generated dynamic list. AI lists
/// carry no "other" slot; static lists keep theirs.
#[derive(Debug, Clone, Serialize)]
pub struct ChoiceList {
    pub options: Vec<String>,
    pub other_index: Option<usize>,
}

impl ChoiceList {
    pub fn from_static(definition: &StageDefinition) -> Self {
        ChoiceList {
            options: definition.choice_set.iter().map(|s| s.to_string()).collect(),
            other_index: definition.other_index,
        }
    }

    pub fn from_generated(options: Vec<String>) -> Self {
        ChoiceList {
            options,
            other_index: None,
        }
    }

    /// Options prefixed with their 1-based number, as shown to the student.
    pub fn numbered(&self) -> Vec<String> {
        self.options
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{}. {}", i + 1, text))
            .collect()
    }
}

/// Read-only per-band stage table. Immutable after construction, so it is
/// freely shared across requests without locking.
#[derive(Debug, Clone)]
pub struct StageCatalog {
    band: SchoolBand,
    stages: Vec<StageDefinition>,
    encouragements: &'static [&'static str],
}

impl StageCatalog {
    pub fn for_band(band: SchoolBand) -> Self {
        let stages = match band {
            SchoolBand::Elementary => elementary_stages(),
            SchoolBand::Middle => middle_stages(),
            SchoolBand::High => high_stages(),
        };
        debug_assert!(stages.iter().enumerate().all(|(i, s)| s.id == i));
        StageCatalog {
            band,
            stages,
            encouragements: ENCOURAGEMENTS,
        }
    }

    pub fn band(&self) -> SchoolBand {
        self.band
    }

    pub fn get(&self, stage_id: usize) -> Option<&StageDefinition> {
        self.stages.get(stage_id)
    }

    pub fn total_stages(&self) -> usize {
        self.stages.len()
    }

    /// Ordinal of the recommendation propose/confirm stage.
    pub fn recommendation_stage(&self) -> usize {
        self.stages
            .iter()
            .position(|s| s.kind == StageKind::Recommendation)
            .expect("every catalog has a recommendation stage")
    }

    /// Ordinal of the terminal plan stage.
    pub fn plan_stage(&self) -> usize {
        self.stages
            .iter()
            .position(|s| s.kind == StageKind::Plan)
            .expect("every catalog has a plan stage")
    }

    /// Ordinal of the AI-dynamic stage, if the band has one.
    pub fn dynamic_stage(&self) -> Option<usize> {
        self.stages.iter().position(|s| s.is_dynamic)
    }

    pub fn encouragements(&self) -> &'static [&'static str] {
        self.encouragements
    }
}

const ENCOURAGEMENTS: &[&str] = &[
    "You're doing great!",
    "Nice pick!",
    "Wonderful!",
    "Impressive!",
    "That's a really good answer!",
    "You clearly thought hard about that!",
    "Fantastic!",
    "What a special way of thinking!",
];

fn elementary_stages() -> Vec<StageDefinition> {
    vec![
        StageDefinition::identity(
            0,
            "Hi there! Ready to explore your future? Tell me your name and grade!",
        ),
        StageDefinition::select(
            1,
            "When does time fly by for you? (pick up to 2)",
            &[
                "Drawing comics or inventing characters",
                "Building things with blocks or robot kits",
                "Trying science experiments and slime kits",
                "Playing soccer, basketball, or running in the park",
                "Looking after animals and walking them",
                "Cooking snacks from a recipe",
                "Reading mysteries and keeping a reading log",
                "Making simple games in a coding app",
                "Filming and editing videos to share",
                "Solving puzzles and board games",
                "Other (write your own)",
            ],
            1,
            2,
            false,
        ),
        StageDefinition::select(
            2,
            "What strengths of yours would you brag about? (pick up to 2)",
            &[
                "I explain things so friends understand easily",
                "I'm great with my hands and build things precisely",
                "I never give up until it's done",
                "I team up well with friends",
                "Ideas pop into my head all the time",
                "I can present in front of everyone without shaking",
                "I'm quick and accurate with numbers",
                "I notice tiny differences others miss",
                "I understand how other people feel",
                "I make plans and stick to the schedule",
                "Other (write your own)",
            ],
            1,
            2,
            false,
        ),
        StageDefinition::select(
            3,
            "What makes you happiest? (pick 1)",
            &[
                "Helping someone out",
                "Making something brand new",
                "Cracking a hard problem",
                "Moving my body and staying active",
                "Performing on a stage",
                "Protecting nature and animals",
                "Reaching a goal together with friends",
                "Learning and organizing new knowledge",
                "Making people laugh",
                "Setting goals and saving up for them",
                "Other (write your own)",
            ],
            1,
            1,
            false,
        ),
        StageDefinition::select(
            4,
            "What worries you most about the future? (pick 1)",
            &[
                "Climate change and trash problems",
                "Caring for elders and people living alone",
                "How people and AI robots will work together",
                "Cyberbullying and keeping personal data safe",
                "Traffic safety and walkable cities",
                "Protecting endangered animals",
                "Space junk and exploration ethics",
                "Health and preventing new diseases",
                "Spotting fake news and finding real facts",
                "Preparing for earthquakes, floods, and rescues",
                "Other (write your own)",
            ],
            1,
            1,
            false,
        ),
        StageDefinition::recommendation(
            5,
            "Here is the dream the AI matched to your answers — do you like it?",
        ),
        StageDefinition::plan(
            6,
            "Let's build the concrete steps that lead to your dream!",
        ),
    ]
}

fn middle_stages() -> Vec<StageDefinition> {
    vec![
        StageDefinition::identity(
            0,
            "Hello! Shall we start exploring your career path? Tell me your name and grade!",
        ),
        StageDefinition::select(
            1,
            "What do you lose track of time doing? Pick a number below. (up to 2)",
            &[
                "Story planning and world-building",
                "Character/concept art (drawing, color)",
                "2D animation (keyframes, timing)",
                "3D/motion graphics (camera work, effects)",
                "Coding and prototyping games or apps",
                "Robotics and making (hardware, sensors)",
                "Science experiments and inquiry (data, graphs)",
                "Sports and physical training",
                "Observing and protecting animals and nature",
                "Cooking, food design, and nutrition",
                "Filming, editing, and sound",
                "Research and interviews (trend scouting)",
                "Other (write your own)",
            ],
            1,
            2,
            false,
        ),
        StageDefinition::select(
            2,
            "What are you especially good at in a team or project? Pick one number.",
            &[
                "Problem framing (zeroing in on the core fast)",
                "Creative ideation (ideas come easily)",
                "Research (finding solid evidence and examples)",
                "Storytelling and persuasion (explaining simply)",
                "Visualization and drawing (diagrams, sketches)",
                "Technical execution (tool mastery, building)",
                "Collaboration and leadership (coordinating, delegating)",
                "Presenting (calm on stage or on camera)",
                "Analysis and improvement (comparing data, applying feedback)",
                "Self-management (deadlines, planning, time)",
                "Other (write your own)",
            ],
            1,
            1,
            false,
        ),
        StageDefinition::select(
            3,
            "In which moments do you feel the most fulfilled or happy? Pick one number.",
            &[
                "Helping or serving someone",
                "Creating something new and putting it into the world",
                "Growing by solving hard problems",
                "Expressing and sharing on stage or screen",
                "Protecting and restoring nature and animals",
                "Achieving a shared goal through team projects",
                "Learning and systematizing knowledge",
                "Making people laugh or feel moved",
                "Setting goals and steadily following through",
                "Other (write your own)",
            ],
            1,
            1,
            false,
        ),
        StageDefinition::select(
            4,
            "Which future-society issue concerns you the most? Pick one number.",
            &[
                "Climate change and resource circulation",
                "Aging population, caregiving, single-person households",
                "Humans working alongside AI and robots",
                "Cyberbullying, privacy, digital well-being",
                "Traffic safety and pedestrian-friendly cities",
                "Biodiversity and endangered species protection",
                "Space debris and exploration ethics",
                "Public health and emerging diseases",
                "Fake news and information literacy",
                "Disaster preparedness and rescue systems",
                "Other (write your own)",
            ],
            1,
            1,
            true,
        ),
        StageDefinition::recommendation(
            5,
            "Based on your earlier choices, here is a proposed one-sentence final dream.",
        ),
        StageDefinition::plan(
            6,
            "Time to generate your results document with realistic mid-goals and actions.",
        ),
    ]
}

fn high_stages() -> Vec<StageDefinition> {
    vec![
        StageDefinition::identity(
            0,
            "Welcome! Let's map your career direction. What's your name and grade?",
        ),
        StageDefinition::select(
            1,
            "Which career fields pull you in right now? (pick up to 2)",
            &[
                "Software and data",
                "Design and visual media",
                "Biology, medicine, and health",
                "Engineering and manufacturing",
                "Business, startups, and finance",
                "Education and counseling",
                "Environment and energy",
                "Law, policy, and public service",
                "Content, broadcasting, and entertainment",
                "Sports and physical wellness",
                "Research and academia",
                "Other (write your own)",
            ],
            1,
            2,
            false,
        ),
        StageDefinition::select(
            2,
            "What do you want your work to give you? (pick up to 2)",
            &[
                "Helping people directly",
                "Creative freedom",
                "Financial stability",
                "Intellectual challenge",
                "Social recognition",
                "Work-life balance",
                "Contributing to society",
                "Growth and mastery",
                "Other (write your own)",
            ],
            1,
            2,
            false,
        ),
        StageDefinition::select(
            3,
            "Which strength would your friends say defines you? Pick one number.",
            &[
                "Logical analysis and structured thinking",
                "Original ideas and lateral thinking",
                "Communication and persuasion",
                "Execution and follow-through",
                "Empathy and listening",
                "Leadership under pressure",
                "Deep focus and patience",
                "Adaptability to new situations",
                "Other (write your own)",
            ],
            1,
            1,
            false,
        ),
        StageDefinition::select(
            4,
            "Which societal issue would you most want your career to engage with? Pick one number.",
            &[
                "Climate adaptation and clean energy transition",
                "AI alignment, automation, and the future of work",
                "Healthcare access and an aging society",
                "Urban housing and transportation equity",
                "Misinformation and media trust",
                "Mental health in a hyper-connected world",
                "Food security and sustainable agriculture",
                "Data privacy and digital rights",
                "Global inequality and fair trade",
                "Other (write your own)",
            ],
            1,
            1,
            true,
        ),
        StageDefinition::recommendation(
            5,
            "Here is a realistic career goal synthesized from your answers.",
        ),
        StageDefinition::plan(
            6,
            "Let's produce your action roadmap: mid-goals, school activities, daily routines.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_parse_roundtrip() {
        for band in [SchoolBand::Elementary, SchoolBand::Middle, SchoolBand::High] {
            assert_eq!(SchoolBand::parse(band.as_str()), Some(band));
        }
        assert_eq!(SchoolBand::parse("kindergarten"), None);
    }

    #[test]
    fn test_catalogs_have_ordinal_ids() {
        for band in [SchoolBand::Elementary, SchoolBand::Middle, SchoolBand::High] {
            let catalog = StageCatalog::for_band(band);
            for (i, stage) in (0..catalog.total_stages()).map(|i| (i, catalog.get(i).unwrap())) {
                assert_eq!(stage.id, i);
            }
            assert!(catalog.get(catalog.total_stages()).is_none());
        }
    }

    #[test]
    fn test_catalog_shape_identity_first_plan_last() {
        for band in [SchoolBand::Elementary, SchoolBand::Middle, SchoolBand::High] {
            let catalog = StageCatalog::for_band(band);
            assert_eq!(catalog.get(0).unwrap().kind, StageKind::Identity);
            assert_eq!(catalog.plan_stage(), catalog.total_stages() - 1);
            assert_eq!(catalog.recommendation_stage(), catalog.plan_stage() - 1);
        }
    }

    #[test]
    fn test_middle_dynamic_stage_is_four() {
        let catalog = StageCatalog::for_band(SchoolBand::Middle);
        assert_eq!(catalog.dynamic_stage(), Some(4));
        // Fallback list must be usable when the provider is down.
        assert!(!catalog.get(4).unwrap().choice_set.is_empty());
    }

    #[test]
    fn test_elementary_has_no_dynamic_stage() {
        let catalog = StageCatalog::for_band(SchoolBand::Elementary);
        assert_eq!(catalog.dynamic_stage(), None);
    }

    #[test]
    fn test_other_index_is_last_choice() {
        let catalog = StageCatalog::for_band(SchoolBand::Middle);
        let stage1 = catalog.get(1).unwrap();
        assert_eq!(stage1.other_index, Some(stage1.choice_set.len()));
        assert_eq!(stage1.choice_set.len(), 13);
        assert_eq!(stage1.selection_max, 2);
    }

    #[test]
    fn test_elementary_stage1_shape_matches_validator_grid() {
        // The "select 1-2, index 11 means other" shape used across tests.
        let catalog = StageCatalog::for_band(SchoolBand::Elementary);
        let stage1 = catalog.get(1).unwrap();
        assert_eq!(stage1.choice_set.len(), 11);
        assert_eq!(stage1.other_index, Some(11));
        assert_eq!((stage1.selection_min, stage1.selection_max), (1, 2));
    }

    #[test]
    fn test_choice_list_numbered() {
        let list = ChoiceList::from_generated(vec!["a".into(), "b".into()]);
        assert_eq!(list.numbered(), vec!["1. a".to_string(), "2. b".to_string()]);
        assert_eq!(list.other_index, None);
    }
}
