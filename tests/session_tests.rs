mod common;

use common::{
    content_delta, event_log, reply, role_delta, RecordingSink, RecordingSynth, RequestLog,
    ScriptedBackend, Scripted,
};
use std::io::Cursor;
use voice_chat::llm::Conversation;
use voice_chat::session::{run_text_chat, run_voice_chat, ExitPhrases};
use voice_chat::stt::SttError;
use voice_chat::tts::{AudioEncoding, SsmlGender, Speaker, VoiceConfig};
use voice_chat::AgentError;

fn logged_conversation(script: Vec<Scripted>) -> (Conversation<ScriptedBackend>, RequestLog) {
    let backend = ScriptedBackend::new(script);
    let requests = backend.requests();
    (Conversation::new(backend, "gpt-3.5-turbo"), requests)
}

fn conversation(script: Vec<Scripted>) -> Conversation<ScriptedBackend> {
    logged_conversation(script).0
}

fn voice() -> VoiceConfig {
    VoiceConfig::new("ja-JP", SsmlGender::Female, AudioEncoding::Linear16)
}

#[test_log::test]
fn test_text_chat_blank_line_ends_without_sending() {
    let (mut conversation, requests) = logged_conversation(vec![]);
    let mut out = Vec::new();

    run_text_chat(&mut conversation, Cursor::new("\nHello\n"), &mut out, false).unwrap();

    assert_eq!(requests.borrow().len(), 0);
    assert!(conversation.history().is_empty());
    assert_eq!(String::from_utf8(out).unwrap(), "user: ");
}

#[test_log::test]
fn test_text_chat_prints_replies() {
    let (mut conversation, requests) =
        logged_conversation(vec![reply("assistant", "4"), reply("assistant", "6")]);
    let mut out = Vec::new();

    run_text_chat(
        &mut conversation,
        Cursor::new("2+2?\n3+3?\n   \nnever sent\n"),
        &mut out,
        false,
    )
    .unwrap();

    assert_eq!(requests.borrow().len(), 2);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "user: assistant: 4\nuser: assistant: 6\nuser: "
    );
}

#[test_log::test]
fn test_text_chat_streams_fragments_and_stops_at_eof() {
    let mut conversation = conversation(vec![Scripted::Stream(vec![
        role_delta("assistant"),
        content_delta("Hel"),
        content_delta("lo"),
    ])]);
    let mut out = Vec::new();

    run_text_chat(&mut conversation, Cursor::new("Hi"), &mut out, true).unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "user: assistant: Hello\nuser: \n"
    );
    assert_eq!(conversation.history().len(), 2);
}

#[test_log::test]
fn test_voice_chat_speaks_replies_until_exit_phrase() {
    let events = event_log();
    let speaker = Speaker::new(
        RecordingSynth {
            events: events.clone(),
        },
        RecordingSink {
            events: events.clone(),
        },
    );
    let (mut conversation, requests) =
        logged_conversation(vec![reply("assistant", "はい、こんにちは")]);
    let transcripts = vec![
        Ok("こんにちは".to_string()),
        Ok("これで終了します".to_string()),
        Ok("聞こえない".to_string()),
    ];
    let mut out = Vec::new();

    run_voice_chat(
        transcripts,
        &mut conversation,
        &speaker,
        &voice(),
        &mut out,
        &ExitPhrases::default(),
        false,
    )
    .unwrap();

    assert_eq!(requests.borrow().len(), 1);
    assert_eq!(
        *events.borrow(),
        vec![
            "synth:LINEAR16:はい、こんにちは".to_string(),
            "play:wav:はい、こんにちは".to_string(),
        ]
    );
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "user: こんにちは\nassistant: はい、こんにちは\nuser: これで終了します\nExiting..\n"
    );
}

#[test_log::test]
fn test_voice_chat_streaming_speaks_fragments_in_order() {
    let events = event_log();
    let speaker = Speaker::new(
        RecordingSynth {
            events: events.clone(),
        },
        RecordingSink {
            events: events.clone(),
        },
    );
    let mut conversation = conversation(vec![Scripted::Stream(vec![
        role_delta("assistant"),
        content_delta("Hello."),
        content_delta(" "),
        content_delta("Bye."),
    ])]);
    let mut out = Vec::new();

    run_voice_chat(
        vec![Ok("hi".to_string())],
        &mut conversation,
        &speaker,
        &voice(),
        &mut out,
        &ExitPhrases::default(),
        true,
    )
    .unwrap();

    assert_eq!(
        *events.borrow(),
        vec![
            "synth:LINEAR16:Hello.".to_string(),
            "play:wav:Hello.".to_string(),
            "synth:LINEAR16:Bye.".to_string(),
            "play:wav:Bye.".to_string(),
        ]
    );
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "user: hi\nassistant: Hello. Bye.\nuser: \n"
    );
    assert_eq!(conversation.history().last().unwrap().content, "Hello. Bye.");
}

#[test_log::test]
fn test_voice_chat_propagates_transcription_errors() {
    let events = event_log();
    let speaker = Speaker::new(
        RecordingSynth {
            events: events.clone(),
        },
        RecordingSink {
            events: events.clone(),
        },
    );
    let mut conversation = conversation(vec![]);
    let mut out = Vec::new();

    let err = run_voice_chat(
        vec![Err(SttError::Connection("refused".to_string()))],
        &mut conversation,
        &speaker,
        &voice(),
        &mut out,
        &ExitPhrases::default(),
        false,
    )
    .unwrap_err();

    assert!(matches!(err, AgentError::Stt(SttError::Connection(_))));
    assert!(events.borrow().is_empty());
}
