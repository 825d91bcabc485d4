use anyhow::{Context, Result};
use audio::device::Direction;
use audio::{AudioBuffer, CpalSink, Microphone, MicrophoneConfig};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io;
use std::path::PathBuf;

use voice_chat::config::{load_config, ApiConfig};
use voice_chat::llm::{Conversation, OpenAiClient};
use voice_chat::session::{run_text_chat, run_voice_chat, ExitPhrases};
use voice_chat::stt::{StreamingConfig, StreamingTranscriber, WsRecognitionService};
use voice_chat::tts::{AudioEncoding, GoogleTts, Speaker, SsmlGender, Utterance, VoiceConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Chat model name
    #[arg(long, global = true, default_value = "gpt-3.5-turbo")]
    model: String,

    /// System message to seed the conversation with (repeatable)
    #[arg(long = "system", global = true)]
    system: Vec<String>,

    /// Stream replies as they are generated
    #[arg(long, global = true)]
    stream: bool,

    /// Keep at most this many non-system messages in the history
    #[arg(long, global = true)]
    max_messages: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chat by typing; a blank line ends the session
    Chat,
    /// Chat by speaking; say an exit phrase to end the session
    Voice {
        #[command(flatten)]
        voice: VoiceOptions,

        /// Capture sample rate in Hz
        #[arg(
            long,
            default_value_t = 16_000,
            value_parser = clap::value_parser!(u32).range(8_000..=192_000)
        )]
        sample_rate: u32,

        /// Input device name (default device if omitted)
        #[arg(long)]
        device: Option<String>,
    },
    /// Speak one text, or save the synthesized audio to a file
    Say {
        text: String,

        #[command(flatten)]
        voice: VoiceOptions,

        /// Write the audio here instead of playing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List audio input and output devices
    Devices,
}

#[derive(ClapArgs, Debug)]
struct VoiceOptions {
    /// Language code for recognition and synthesis
    #[arg(long, default_value = "ja-JP")]
    language: String,

    /// Voice gender: male, female or neutral
    #[arg(long, default_value = "female")]
    gender: SsmlGender,

    /// Synthesized audio encoding (linear16 or mp3 can be played)
    #[arg(long, default_value = "linear16")]
    encoding: AudioEncoding,
}

impl VoiceOptions {
    fn voice_config(&self) -> VoiceConfig {
        VoiceConfig::new(self.language.clone(), self.gender, self.encoding)
    }
}

fn build_conversation(args: &Args, config: &ApiConfig) -> Result<Conversation<OpenAiClient>> {
    let client = OpenAiClient::from_config(config).context("Failed to create chat client")?;
    let mut conversation =
        Conversation::new(client, args.model.clone()).with_system_messages(args.system.clone());
    if let Some(max) = args.max_messages {
        conversation = conversation.with_max_messages(max);
    }
    log::info!(
        "🧠 Chat model {} with {} system message(s)",
        args.model,
        args.system.len()
    );
    Ok(conversation)
}

fn run_chat(args: &Args, config: &ApiConfig) -> Result<()> {
    let mut conversation = build_conversation(args, config)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_text_chat(&mut conversation, stdin.lock(), &mut stdout, args.stream)?;
    Ok(())
}

fn run_voice(
    args: &Args,
    config: &ApiConfig,
    voice: &VoiceOptions,
    sample_rate: u32,
    device: Option<String>,
) -> Result<()> {
    let voice_config = voice.voice_config();
    // Fail on an unplayable encoding before opening any device
    voice_config.audio_encoding.container_format()?;

    let mut conversation = build_conversation(args, config)?;
    let recognizer =
        WsRecognitionService::from_config(config).context("Failed to configure speech stream")?;
    let sink = CpalSink::new().context("Failed to open audio output")?;
    let speaker = Speaker::new(GoogleTts::from_config(config), sink);

    let microphone = Microphone::open(
        MicrophoneConfig {
            device_name: device,
            sample_rate,
        },
        AudioBuffer::new(),
    )
    .context("Failed to open microphone")?;

    let transcriber = StreamingTranscriber::new(
        recognizer,
        StreamingConfig::linear16(sample_rate, voice.language.clone()),
        microphone.chunks(),
    );

    log::info!("🎤 Listening ({})", voice.language);
    let mut stdout = io::stdout();
    let result = run_voice_chat(
        transcriber,
        &mut conversation,
        &speaker,
        &voice_config,
        &mut stdout,
        &ExitPhrases::default(),
        args.stream,
    );

    let closed = microphone.close();
    end_voice_session(result, closed)
}

/// A failed chat loop explains more than a failed close, so it is reported first.
fn end_voice_session(result: voice_chat::Result<()>, closed: audio::Result<()>) -> Result<()> {
    result?;
    closed.context("Failed to close microphone")?;
    Ok(())
}

fn run_say(
    config: &ApiConfig,
    text: &str,
    voice: &VoiceOptions,
    output: Option<&PathBuf>,
) -> Result<()> {
    let voice_config = voice.voice_config();
    let synthesizer = GoogleTts::from_config(config);

    match output {
        Some(path) => {
            // Saving needs no output device
            let speaker = Speaker::new(synthesizer, NullSink);
            speaker.save(text, &voice_config, path)?;
            println!("{}", path.display());
        }
        None => {
            let sink = CpalSink::new().context("Failed to open audio output")?;
            let speaker = Speaker::new(synthesizer, sink);
            speaker.say(Utterance::from(text), &voice_config)?;
        }
    }
    Ok(())
}

/// Sink for commands that never play audio.
struct NullSink;

impl audio::AudioSink for NullSink {
    fn play(&self, _clip: &[u8], _format: audio::ContainerFormat) -> audio::Result<()> {
        Ok(())
    }
}

fn run_devices() -> Result<()> {
    let devices = audio::list_devices().context("Failed to enumerate audio devices")?;

    println!("Input devices:");
    for device in devices.iter().filter(|d| d.direction == Direction::Input) {
        println!("  {}", device);
    }
    println!("\nOutput devices:");
    for device in devices.iter().filter(|d| d.direction == Direction::Output) {
        println!("  {}", device);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    log::info!("🚀 Starting voice-chat with args: {:?}", args);

    match &args.command {
        Command::Devices => run_devices(),
        Command::Chat => {
            let config = load_config().context("Failed to load configuration")?;
            run_chat(&args, &config)
        }
        Command::Voice {
            voice,
            sample_rate,
            device,
        } => {
            let config = load_config().context("Failed to load configuration")?;
            run_voice(&args, &config, voice, *sample_rate, device.clone())
        }
        Command::Say {
            text,
            voice,
            output,
        } => {
            let config = load_config().context("Failed to load configuration")?;
            run_say(&config, text, voice, output.as_ref())
        }
    }
}
