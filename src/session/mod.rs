//! Interactive scene drafting.
//!
//! A [`SceneSession`] collects the cast, then loops over exchanges: the
//! operator writes a protagonist passage, the oracle answers, and the operator
//! accepts, regenerates with steering, edits, or commits. The draft lives only
//! in the session; committing appends it to the story log and is the only
//! durable write.

use crate::config::{GenerationParams, TaleweaveConfig};
use crate::context::{load_cast, Cast, ContextAssembler, PromptRequest, WorldContext};
use crate::error::Result;
use crate::memory::backup::BackupHandle;
use crate::memory::codec;
use crate::memory::store::MemoryStore;
use crate::memory::types::Tier;
use crate::operator::Operator;
use crate::oracle::{non_empty, Oracle, OracleRequest};

const RULE: &str = "============================================================";

// ── Steering ─────────────────────────────────────────────────────────────────

/// Extra instruction attached to a regeneration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Steering {
    #[default]
    Fresh,
    MajorRedirect(String),
    MinorAdjustment(String),
    Reminder(String),
}

impl Steering {
    /// Build from a regeneration sub-menu choice and its detail text.
    ///
    /// An unknown choice or blank detail gives [`Steering::Fresh`].
    pub fn from_choice(choice: &str, detail: &str) -> Self {
        let detail = detail.trim();
        if detail.is_empty() {
            return Self::Fresh;
        }
        match choice.trim().to_lowercase().as_str() {
            "b" => Self::MajorRedirect(detail.to_string()),
            "c" => Self::MinorAdjustment(detail.to_string()),
            "d" => Self::Reminder(detail.to_string()),
            _ => Self::Fresh,
        }
    }

    /// Text appended to the prompt, if any.
    pub fn instruction(&self) -> Option<String> {
        match self {
            Self::Fresh => None,
            Self::MajorRedirect(detail) => Some(format!("MAJOR CHANGE REQUIRED: {detail}")),
            Self::MinorAdjustment(detail) => Some(format!("MINOR ADJUSTMENT NEEDED: {detail}")),
            Self::Reminder(detail) => Some(format!("IMPORTANT CONTEXT TO REMEMBER: {detail}")),
        }
    }
}

// ── Draft ────────────────────────────────────────────────────────────────────

/// Accepted segments of the scene so far, alternating protagonist and oracle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneDraft {
    segments: Vec<String>,
    steering: Steering,
}

impl SceneDraft {
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn exchanges(&self) -> usize {
        self.segments.len() / 2
    }

    pub fn steering(&self) -> &Steering {
        &self.steering
    }

    pub fn steer(&mut self, steering: Steering) {
        self.steering = steering;
    }

    /// Add one finished exchange and clear the steering.
    pub fn accept(&mut self, passage: &str, response: &str) {
        self.segments.push(passage.trim().to_string());
        self.segments.push(response.trim().to_string());
        self.steering = Steering::Fresh;
    }

    pub fn render(&self) -> String {
        self.segments.join("\n\n")
    }

    /// The draft plus a pending exchange, as it would be committed.
    pub fn render_with(&self, passage: &str, response: &str) -> String {
        self.segments
            .iter()
            .map(String::as_str)
            .chain([passage.trim(), response.trim()])
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneOutcome {
    /// The scene was appended to the story log.
    Committed {
        exchanges: usize,
        backup: Option<BackupHandle>,
    },
    /// The operator stopped without committing. Nothing was written.
    Abandoned { exchanges: usize },
    /// No requested character could be loaded.
    NoCast,
}

#[derive(Debug, Clone)]
pub struct SceneSettings {
    pub params: GenerationParams,
    /// Oracle attempts per generation.
    pub max_attempts: usize,
    pub story_tail_chars: usize,
}

impl SceneSettings {
    pub fn from_config(config: &TaleweaveConfig) -> Self {
        Self {
            params: config.oracle.scene.clone(),
            max_attempts: config.session.max_attempts.max(1),
            story_tail_chars: config.context.story_tail_chars,
        }
    }
}

enum Exchange {
    Accepted,
    Dropped,
    Committed(Option<BackupHandle>),
    InputClosed,
}

pub struct SceneSession<'a> {
    memory: &'a MemoryStore,
    world: WorldContext,
    oracle: &'a dyn Oracle,
    operator: &'a mut dyn Operator,
    settings: SceneSettings,
}

impl<'a> SceneSession<'a> {
    pub fn new(
        memory: &'a MemoryStore,
        world: WorldContext,
        oracle: &'a dyn Oracle,
        operator: &'a mut dyn Operator,
        settings: SceneSettings,
    ) -> Self {
        Self {
            memory,
            world,
            oracle,
            operator,
            settings,
        }
    }

    /// Run the session to its end.
    pub async fn run(mut self) -> Result<SceneOutcome> {
        let Some(names) = self
            .operator
            .ask("Characters in this scene (comma-separated): ")
        else {
            return Ok(SceneOutcome::NoCast);
        };
        let names: Vec<&str> = names
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .collect();

        self.operator.say("\nLoading context...");
        let cast = load_cast(self.memory, &names)?;
        for name in &cast.missing {
            self.operator
                .say(&format!("Warning: no records found for '{name}', skipping"));
        }
        if cast.is_empty() {
            self.operator.say("No characters loaded. Ending session.");
            return Ok(SceneOutcome::NoCast);
        }

        let story = self.memory.story_log()?;
        let assembler =
            ContextAssembler::new(self.world.clone(), &story, self.settings.story_tail_chars);
        self.show_context(&cast);
        tracing::info!(characters = cast.members.len(), "scene session started");

        self.operator.say("\n=== INTERACTIVE SCENE MODE ===\n");
        let mut draft = SceneDraft::default();

        loop {
            let passage = self.operator.ask_block(
                "\n[YOUR TURN - write the protagonist's paragraph]\n(Enter an empty line when done)\n",
            );
            let passage = match passage {
                Some(p) if !p.trim().is_empty() => p.trim().to_string(),
                _ => {
                    self.operator.say("Empty input. Ending scene.");
                    return Ok(abandoned(&draft));
                }
            };

            match self.exchange(&assembler, &cast, &mut draft, &passage).await? {
                Exchange::Committed(backup) => {
                    return Ok(SceneOutcome::Committed {
                        exchanges: draft.exchanges() + 1,
                        backup,
                    });
                }
                Exchange::InputClosed => return Ok(abandoned(&draft)),
                Exchange::Accepted | Exchange::Dropped => {}
            }

            if !self.operator.confirm("\nContinue writing this scene? (y/n): ") {
                self.operator.say("\nScene incomplete. Progress not saved.");
                return Ok(abandoned(&draft));
            }
        }
    }

    /// One passage: generate, review, and act on the operator's choice.
    async fn exchange(
        &mut self,
        assembler: &ContextAssembler,
        cast: &Cast,
        draft: &mut SceneDraft,
        passage: &str,
    ) -> Result<Exchange> {
        'generate: loop {
            let instruction = draft.steering().instruction();
            let prompt = assembler.assemble(
                cast,
                &PromptRequest {
                    draft: draft.segments(),
                    passage,
                    steering: instruction.as_deref(),
                },
            );
            let Some(response) = self.generate(&prompt).await else {
                self.operator
                    .say("Exchange abandoned. The draft is unchanged.");
                draft.steer(Steering::Fresh);
                return Ok(Exchange::Dropped);
            };

            self.operator.say(&format!("\n{RULE}\nAI RESPONSE:\n{RULE}"));
            self.operator.say(&response);
            self.operator.say(RULE);

            loop {
                self.operator.say(
                    "\n=== OPTIONS ===\n\
                     [1] Accept - continue writing\n\
                     [2] Regenerate - see submenu\n\
                     [3] Edit manually - paste your version\n\
                     [4] Commit scene - save and exit",
                );
                let Some(choice) = self.operator.ask("Choose: ") else {
                    return Ok(Exchange::InputClosed);
                };

                match choice.trim() {
                    "1" => {
                        draft.accept(passage, &response);
                        self.operator.say("\nAdded to scene draft.");
                        return Ok(Exchange::Accepted);
                    }
                    "2" => {
                        let Some(steering) = self.ask_steering() else {
                            return Ok(Exchange::InputClosed);
                        };
                        draft.steer(steering);
                        continue 'generate;
                    }
                    "3" => {
                        let Some(edited) = self
                            .operator
                            .ask_block("\nPaste your edited version (empty line when done):\n")
                        else {
                            return Ok(Exchange::InputClosed);
                        };
                        if edited.trim().is_empty() {
                            self.operator
                                .say("No input received. Returning to options...");
                            continue;
                        }
                        draft.accept(passage, &edited);
                        self.operator.say("\nEdited version added to draft.");
                        return Ok(Exchange::Accepted);
                    }
                    "4" => {
                        let scene = draft.render_with(passage, &response);
                        self.operator
                            .say(&format!("\n{RULE}\nFINAL SCENE:\n{RULE}\n{scene}\n{RULE}"));
                        if !self.operator.confirm("\nCommit this scene? (y/n): ") {
                            self.operator
                                .say("Commit cancelled. Returning to options...");
                            continue;
                        }
                        match self.memory.append_story(&scene) {
                            Ok(backup) => {
                                self.operator.say("\nScene committed to the story log.");
                                self.operator.say(
                                    "REMINDER: run `taleweave remember` to update character memories.",
                                );
                                return Ok(Exchange::Committed(backup));
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "scene commit failed");
                                self.operator.say(&format!(
                                    "Could not commit scene: {e}. Returning to options..."
                                ));
                            }
                        }
                    }
                    _ => self.operator.say("Invalid choice. Try again."),
                }
            }
        }
    }

    /// Call the oracle, offering retries up to `max_attempts`. `None` when the
    /// operator gives up or attempts run out.
    async fn generate(&mut self, prompt: &str) -> Option<String> {
        let request = OracleRequest::new(prompt, &self.settings.params);
        let mut attempt = 1;
        loop {
            self.operator.say("Generating AI response...");
            let result = self
                .oracle
                .generate(&request)
                .await
                .and_then(|text| non_empty(&text));
            match result {
                Ok(text) => return Some(text),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "scene generation failed");
                    self.operator.say(&format!("Generation failed: {e}"));
                }
            }

            if attempt >= self.settings.max_attempts {
                self.operator
                    .say(&format!("Giving up after {attempt} attempts."));
                return None;
            }
            if !self.operator.confirm("Retry? (y/n): ") {
                return None;
            }
            attempt += 1;
        }
    }

    /// Regeneration sub-menu. `None` if input closed.
    fn ask_steering(&mut self) -> Option<Steering> {
        self.operator.say(
            "\n=== REGENERATE OPTIONS ===\n\
             [a] Fresh regeneration - completely new response\n\
             [b] Major redirect - big structural/action changes\n\
             [c] Minor adjustment - small tone/detail tweaks\n\
             [d] Remind of detail - inject forgotten context/fact",
        );
        let choice = self.operator.ask("Choose: ")?.trim().to_lowercase();
        let question = match choice.as_str() {
            "a" => return Some(Steering::Fresh),
            "b" => "\nDescribe major change needed: ",
            "c" => "\nDescribe minor adjustment: ",
            "d" => "\nWhat detail should the AI remember?: ",
            _ => {
                self.operator.say("Invalid choice. Regenerating fresh...");
                return Some(Steering::Fresh);
            }
        };
        let detail = self.operator.ask(question)?;
        let steering = Steering::from_choice(&choice, &detail);
        if steering == Steering::Fresh {
            self.operator.say("Nothing specified. Regenerating fresh...");
        }
        Some(steering)
    }

    fn show_context(&mut self, cast: &Cast) {
        self.operator.say("\n=== CONTEXT ===");
        for member in &cast.members {
            let background_lines = member.background.lines().count();
            let shortterm = codec::count_entries(Some(member.shortterm.as_str()));
            let longterm = codec::count_entries(Some(member.longterm.as_str()));
            self.operator.say(&format!(
                "  {}: {} {} lines, {} {} entries, {} {} entries",
                member.key.display_name(),
                Tier::Background,
                background_lines,
                Tier::Shortterm,
                shortterm,
                Tier::Longterm,
                longterm,
            ));
        }
        let loaded = |text: &str| if text.trim().is_empty() { "MISSING" } else { "loaded" };
        self.operator.say(&format!(
            "  Style guide: {}, world encyclopedia: {}, world state: {}",
            loaded(&self.world.style_guide),
            loaded(&self.world.world_encyclopedia),
            loaded(&self.world.world_state),
        ));
    }
}

fn abandoned(draft: &SceneDraft) -> SceneOutcome {
    SceneOutcome::Abandoned {
        exchanges: draft.exchanges(),
    }
}
