mod helpers;

use axum::http::StatusCode;
use helpers::{quick_params, spawn_stub_server, test_store, StubOracle};
use taleweave::context::WorldContext;
use taleweave::memory::CharacterProfile;
use taleweave::oracle::HttpOracle;
use taleweave::operator::ScriptedOperator;
use taleweave::session::{SceneOutcome, SceneSession, SceneSettings};

fn settings() -> SceneSettings {
    SceneSettings {
        params: quick_params(),
        max_attempts: 3,
        story_tail_chars: 0,
    }
}

fn with_cast(t: &helpers::TestStore) {
    t.memory
        .create_character("Marcus", &CharacterProfile::new("A guard."))
        .unwrap();
    t.memory
        .create_character("Sera", &CharacterProfile::new("A smuggler."))
        .unwrap();
}

#[tokio::test]
async fn empty_first_passage_ends_without_writing() {
    let t = test_store();
    with_cast(&t);
    let oracle = StubOracle::new();
    let mut op = ScriptedOperator::new(["Marcus, Sera", ""]);

    let outcome = SceneSession::new(
        &t.memory,
        WorldContext::default(),
        &oracle,
        &mut op,
        settings(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(outcome, SceneOutcome::Abandoned { exchanges: 0 });
    assert_eq!(oracle.calls(), 0);
    assert_eq!(t.memory.story_log().unwrap(), "");
    assert!(op.saw("Empty input. Ending scene."));
}

#[tokio::test]
async fn no_loadable_cast_ends_session() {
    let t = test_store();
    let oracle = StubOracle::new();
    let mut op = ScriptedOperator::new(["Nobody"]);

    let outcome = SceneSession::new(
        &t.memory,
        WorldContext::default(),
        &oracle,
        &mut op,
        settings(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(outcome, SceneOutcome::NoCast);
    assert!(op.saw("no records found for 'Nobody'"));
}

#[tokio::test]
async fn accept_then_commit_appends_the_whole_scene() {
    let t = test_store();
    with_cast(&t);
    t.memory.append_story("Earlier chapter.").unwrap();
    let oracle = StubOracle::replying(["Marcus nods.", "Sera laughs."]);
    let mut op = ScriptedOperator::new([
        "Marcus, Sera",
        "I enter the tavern.",
        "",
        "1",
        "y",
        "I order a drink.",
        "",
        "4",
        "y",
    ]);

    let outcome = SceneSession::new(
        &t.memory,
        WorldContext::default(),
        &oracle,
        &mut op,
        settings(),
    )
    .run()
    .await
    .unwrap();

    match outcome {
        SceneOutcome::Committed { exchanges, backup } => {
            assert_eq!(exchanges, 2);
            assert!(backup.is_some(), "existing story log is backed up");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
        t.memory.story_log().unwrap(),
        "Earlier chapter.\n\n\
         I enter the tavern.\n\nMarcus nods.\n\n\
         I order a drink.\n\nSera laughs.\n"
    );

    let second_prompt = &oracle.prompts()[1];
    assert!(second_prompt.contains("CURRENT SCENE SO FAR:\nI enter the tavern.\n\nMarcus nods."));
    assert!(second_prompt.contains("LATEST ACTION:\nI order a drink."));
    assert_eq!(op.remaining(), 0);
}

#[tokio::test]
async fn regenerate_with_steering_does_not_touch_draft() {
    let t = test_store();
    with_cast(&t);
    let oracle = StubOracle::replying(["Too violent.", "Marcus sheathes his blade."]);
    let mut op = ScriptedOperator::new([
        "Marcus",
        "I draw my sword.",
        "",
        "2",
        "c",
        "less gore",
        "4",
        "y",
    ]);

    SceneSession::new(
        &t.memory,
        WorldContext::default(),
        &oracle,
        &mut op,
        settings(),
    )
    .run()
    .await
    .unwrap();

    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("MINOR ADJUSTMENT NEEDED"));
    assert!(prompts[1].contains("MINOR ADJUSTMENT NEEDED: less gore"));
    assert!(prompts[1].contains("CURRENT SCENE SO FAR:\n\n"));
    assert_eq!(
        t.memory.story_log().unwrap(),
        "I draw my sword.\n\nMarcus sheathes his blade.\n"
    );
}

#[tokio::test]
async fn empty_steering_detail_regenerates_fresh() {
    let t = test_store();
    with_cast(&t);
    let oracle = StubOracle::replying(["One.", "Two."]);
    let mut op = ScriptedOperator::new(["Marcus", "Hello.", "", "2", "b", "   "]);

    SceneSession::new(
        &t.memory,
        WorldContext::default(),
        &oracle,
        &mut op,
        settings(),
    )
    .run()
    .await
    .unwrap();

    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0], prompts[1]);
    assert!(op.saw("Regenerating fresh"));
}

#[tokio::test]
async fn edit_replaces_response_and_empty_edit_is_rejected() {
    let t = test_store();
    with_cast(&t);
    let oracle = StubOracle::replying(["Marcus shrugs."]);
    let mut op = ScriptedOperator::new([
        "Marcus",
        "I ask about the gate.",
        "",
        "3",
        "",
        "3",
        "Marcus points north.",
        "",
        "n",
    ]);

    let outcome = SceneSession::new(
        &t.memory,
        WorldContext::default(),
        &oracle,
        &mut op,
        settings(),
    )
    .run()
    .await
    .unwrap();

    assert!(op.saw("No input received. Returning to options..."));
    assert!(op.saw("Edited version added to draft."));
    assert_eq!(outcome, SceneOutcome::Abandoned { exchanges: 1 });
    assert_eq!(t.memory.story_log().unwrap(), "");
}

#[tokio::test]
async fn declined_commit_returns_to_review_with_draft_unchanged() {
    let t = test_store();
    with_cast(&t);
    let oracle = StubOracle::replying(["Sera smiles."]);
    let mut op = ScriptedOperator::new(["Sera", "I wave.", "", "4", "n", "9", "4", "y"]);

    let outcome = SceneSession::new(
        &t.memory,
        WorldContext::default(),
        &oracle,
        &mut op,
        settings(),
    )
    .run()
    .await
    .unwrap();

    assert!(op.saw("Commit cancelled. Returning to options..."));
    assert!(op.saw("Invalid choice. Try again."));
    assert_eq!(oracle.calls(), 1, "invalid choice does not regenerate");
    assert!(matches!(outcome, SceneOutcome::Committed { exchanges: 1, .. }));
    assert_eq!(t.memory.story_log().unwrap(), "I wave.\n\nSera smiles.\n");
}

#[tokio::test]
async fn retries_are_bounded_and_failure_abandons_the_exchange() {
    let t = test_store();
    with_cast(&t);
    let oracle = StubOracle::failing(3);
    let mut op = ScriptedOperator::new(["Marcus", "I knock.", "", "y", "y", "n"]);

    let outcome = SceneSession::new(
        &t.memory,
        WorldContext::default(),
        &oracle,
        &mut op,
        settings(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(oracle.calls(), 3);
    assert!(op.saw("Giving up after 3 attempts."));
    assert_eq!(outcome, SceneOutcome::Abandoned { exchanges: 0 });
    assert_eq!(t.memory.story_log().unwrap(), "");
}

#[tokio::test]
async fn http_500_from_oracle_leaves_story_unchanged() {
    let t = test_store();
    with_cast(&t);
    t.memory.append_story("Chapter one.").unwrap();
    let server = spawn_stub_server(StatusCode::INTERNAL_SERVER_ERROR, "model crashed").await;
    let oracle = HttpOracle::new(&server.base_url);
    let mut op = ScriptedOperator::new(["Marcus", "I knock.", "", "y", "n", "n"]);

    let outcome = SceneSession::new(
        &t.memory,
        WorldContext::default(),
        &oracle,
        &mut op,
        settings(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(server.hits(), 2, "one retry, then the operator declines");
    assert!(op.saw("500"));
    assert_eq!(outcome, SceneOutcome::Abandoned { exchanges: 0 });
    assert_eq!(t.memory.story_log().unwrap(), "Chapter one.\n");
}

#[tokio::test]
async fn closed_input_mid_review_abandons() {
    let t = test_store();
    with_cast(&t);
    let oracle = StubOracle::replying(["Marcus waits."]);
    let mut op = ScriptedOperator::new(["Marcus", "I wait.", ""]);

    let outcome = SceneSession::new(
        &t.memory,
        WorldContext::default(),
        &oracle,
        &mut op,
        settings(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(outcome, SceneOutcome::Abandoned { exchanges: 0 });
    assert_eq!(t.memory.story_log().unwrap(), "");
}
