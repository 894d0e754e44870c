//! Interactive console game against a knowledge file.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use guess_core::model::AnswerScale;
use guess_core::store::{JsonFileStore, JsonlSuggestionLog};
use guess_core::{Engine, EngineConfig, SessionId, SessionRegistry, Turn};

pub struct ConsoleOptions {
    pub knowledge: PathBuf,
    pub suggestions: PathBuf,
}

/// Plays one game over `input`/`output`, returning the final turn.
pub fn run_console(
    options: &ConsoleOptions,
    config: EngineConfig,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Turn> {
    let engine = Engine::load(
        config,
        Arc::new(JsonFileStore::new(&options.knowledge)),
        Arc::new(JsonlSuggestionLog::new(&options.suggestions)),
    )
    .with_context(|| format!("loading knowledge from {}", options.knowledge.display()))?;
    let registry = SessionRegistry::new(Arc::new(engine));

    let (id, opening) = registry.begin();
    let scale = opening.scale.clone();
    let mut turn = Turn::Question {
        text: opening.question,
        index: opening.question_index,
        ordinal: opening.ordinal,
    };

    loop {
        match &turn {
            Turn::Question { text, ordinal, .. } => {
                writeln!(output, "Question {ordinal} : {text}")?;
                for (index, label) in scale.iter().enumerate() {
                    writeln!(output, "  {index}. {label}")?;
                }
                let answer = prompt_answer(input, output)?;
                turn = registry.submit_answer(id, answer)?;
            }
            Turn::Guess {
                candidate,
                confidence,
                ..
            } => {
                writeln!(
                    output,
                    "Je pense à : {candidate} ({:.0}%). C'est ça ? [o/n]",
                    confidence * 100.0
                )?;
                let correct = prompt_yes_no(input, output)?;
                turn = registry.confirm(id, correct)?;
            }
            Turn::Confirmed { candidate, persisted } => {
                writeln!(output, "J'ai trouvé : {candidate} !")?;
                if !persisted {
                    writeln!(output, "(apprentissage non sauvegardé)")?;
                }
                return Ok(turn);
            }
            Turn::SuggestionRequired => {
                suggest(&registry, id, input, output)?;
                return Ok(turn);
            }
        }
    }
}

fn suggest(
    registry: &SessionRegistry,
    id: SessionId,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<()> {
    writeln!(output, "Je donne ma langue au chat. À quoi pensiez-vous ?")?;
    let candidate = read_line(input)?;
    writeln!(output, "Quelle question permettrait de le reconnaître ?")?;
    let question = read_line(input)?;
    let ack = registry.contribute_suggestion(id, &candidate, &question)?;
    if ack.recorded {
        writeln!(output, "Merci, suggestion enregistrée.")?;
    } else {
        writeln!(output, "Merci ! (la suggestion n'a pas pu être enregistrée)")?;
    }
    Ok(())
}

fn prompt_answer(input: &mut impl BufRead, output: &mut impl Write) -> Result<usize> {
    loop {
        let line = read_line(input)?;
        match line.parse::<usize>() {
            Ok(index) if index < AnswerScale::SIZE => return Ok(index),
            _ => writeln!(output, "Réponse attendue : 0 à {}", AnswerScale::SIZE - 1)?,
        }
    }
}

fn prompt_yes_no(input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    loop {
        match read_line(input)?.to_lowercase().as_str() {
            "o" | "oui" | "y" | "yes" => return Ok(true),
            "n" | "non" | "no" => return Ok(false),
            _ => writeln!(output, "Répondez par o ou n.")?,
        }
    }
}

fn read_line(input: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("input closed before the game finished");
    }
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use guess_core::game::serialization::KnowledgeSnapshot;
    use guess_core::model::KnowledgeBase;
    use std::fs;
    use std::io::Cursor;

    fn write_knowledge(dir: &std::path::Path) -> ConsoleOptions {
        let kb = KnowledgeBase::new(
            vec!["Chat".into(), "Chien".into(), "Poisson".into()],
            vec![1, 1, 1],
            vec!["Miaule-t-il ?".into(), "Aboie-t-il ?".into()],
            vec![vec![0.9, 0.1, 0.5], vec![0.2, 0.8, 0.5]],
        )
        .expect("valid");
        let path = dir.join("animals.json");
        fs::write(&path, KnowledgeSnapshot::to_json(&kb).expect("json")).expect("write");
        ConsoleOptions {
            knowledge: path,
            suggestions: dir.join("suggestions.jsonl"),
        }
    }

    #[test]
    fn console_game_learns_and_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let options = write_knowledge(dir.path());
        let mut input = Cursor::new("7\n0\n4\no\n");
        let mut output = Vec::new();

        let turn = run_console(&options, EngineConfig::default(), &mut input, &mut output)
            .expect("game finishes");
        assert_eq!(
            turn,
            Turn::Confirmed {
                candidate: "Chat".into(),
                persisted: true,
            }
        );

        let transcript = String::from_utf8(output).expect("utf8");
        assert!(transcript.contains("Question 1 : Miaule-t-il ?"));
        assert!(transcript.contains("Réponse attendue"));
        assert!(transcript.contains("Question 2 : Aboie-t-il ?"));
        assert!(transcript.contains("J'ai trouvé : Chat !"));

        let saved = fs::read_to_string(&options.knowledge).expect("saved");
        let kb = KnowledgeSnapshot::from_json(&saved)
            .expect("parse")
            .restore()
            .expect("restore");
        assert_eq!(kb.appearances(), &[2, 1, 1]);
        assert_eq!(kb.expected(0, 0), 0.91);
    }

    #[test]
    fn console_escalation_records_suggestion() {
        let dir = tempfile::tempdir().expect("tempdir");
        let options = write_knowledge(dir.path());
        let mut input = Cursor::new("0\n0\nn\nn\nn\nLapin\nA-t-il de longues oreilles ?\n");
        let mut output = Vec::new();

        let turn = run_console(&options, EngineConfig::default(), &mut input, &mut output)
            .expect("game finishes");
        assert_eq!(turn, Turn::SuggestionRequired);

        let log = fs::read_to_string(&options.suggestions).expect("suggestion log");
        assert!(log.contains("\"candidate\":\"Lapin\""));
    }

    #[test]
    fn closed_input_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let options = write_knowledge(dir.path());
        let mut input = Cursor::new("0\n");
        let mut output = Vec::new();
        assert!(run_console(&options, EngineConfig::default(), &mut input, &mut output).is_err());
    }
}
