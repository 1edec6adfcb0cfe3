//! Line commands read from standard input.

use anyhow::{Context, bail};

use mailsync_core::{Command, DeleteKind, SetAction, Uid};

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Forward to the engine.
    Command(Command),
    /// Confirm the last permanent delete the engine asked about.
    Confirm,
    /// Print the command list.
    Help,
}

/// Command summary printed by `help`.
pub const HELP: &str = "\
reload[!]                      refetch the list (! also drops page and folder hash)
open <folder>                  display a folder
page <n> | search [text]       change the list position
thread <uid> | unthread        open or leave a thread
select [uid] | check <uid> | uncheck <uid>
move|copy <from> <to> <uids>   uids are comma separated
trash|spam|ham|archive <folder> <uids>
delete                         permanently delete checked or selected (dangerous actions)
yes                            confirm the pending delete
seen|unseen|flag|unflag <folder> [uids]
seen-all|unseen-all <folder>
poll [folder] | folders | quota | accounts | contacts
expand|collapse <folder hash>
quit";

/// Parses one line. Blank lines yield `None`.
///
/// # Errors
///
/// Returns an error for unknown commands or bad arguments.
pub fn parse(line: &str) -> anyhow::Result<Option<Line>> {
    let line = line.trim();
    let Some((word, rest)) = split_word(line) else {
        return Ok(None);
    };

    let command = match word {
        "help" | "?" => return Ok(Some(Line::Help)),
        "yes" | "y" => return Ok(Some(Line::Confirm)),
        "reload" => Command::ReloadMessageList {
            drop_page: false,
            drop_folder_cache: false,
        },
        "reload!" => Command::ReloadMessageList {
            drop_page: true,
            drop_folder_cache: true,
        },
        "open" => Command::OpenFolder(required(rest, "folder")?.to_string()),
        "page" => Command::SetPage(
            required(rest, "page")?
                .parse()
                .with_context(|| format!("invalid page: {rest}"))?,
        ),
        "search" => Command::SetSearch(rest.to_string()),
        "thread" => Command::OpenThread(parse_uid(required(rest, "uid")?)?),
        "unthread" => Command::CloseThread,
        "select" if rest.is_empty() => Command::Select(None),
        "select" => Command::Select(Some(parse_uid(rest)?)),
        "check" | "uncheck" => Command::SetChecked {
            uid: parse_uid(required(rest, "uid")?)?,
            checked: word == "check",
        },
        "move" | "copy" => {
            let (from, rest) = split_word(rest).context("missing source folder")?;
            let (to, uids) = split_word(rest).context("missing destination folder")?;
            Command::MoveMessages {
                from: from.to_string(),
                uids: parse_uids(required(uids, "uids")?)?,
                to: to.to_string(),
                copy: word == "copy",
            }
        }
        "trash" | "spam" | "ham" | "archive" => {
            let (folder, uids) = split_word(rest).context("missing folder")?;
            let kind = match word {
                "trash" => DeleteKind::Trash,
                "spam" => DeleteKind::Spam,
                "ham" => DeleteKind::NotSpam,
                _ => DeleteKind::Archive,
            };
            Command::DeleteMessages {
                kind,
                folder: folder.to_string(),
                uids: parse_uids(required(uids, "uids")?)?,
                use_folder: true,
            }
        }
        "delete" => Command::DeleteWithoutMove,
        "seen" | "unseen" | "flag" | "unflag" => {
            let (folder, uids) = split_word(rest).context("missing folder")?;
            let action = match word {
                "seen" => SetAction::SetSeen,
                "unseen" => SetAction::UnsetSeen,
                "flag" => SetAction::SetFlag,
                _ => SetAction::UnsetFlag,
            };
            let uids = if uids.is_empty() {
                None
            } else {
                Some(parse_uids(uids)?)
            };
            Command::SetAction {
                folder: folder.to_string(),
                action,
                uids,
            }
        }
        "seen-all" | "unseen-all" => Command::SetActionForAll {
            folder: required(rest, "folder")?.to_string(),
            action: if word == "seen-all" {
                SetAction::SetSeen
            } else {
                SetAction::UnsetSeen
            },
        },
        "poll" if rest.is_empty() => Command::FolderInformationMultiply,
        "poll" => Command::FolderInformation(rest.to_string()),
        "expand" | "collapse" => Command::SetExpandedFolder {
            full_name_hash: required(rest, "folder hash")?.to_string(),
            expanded: word == "expand",
        },
        "folders" => Command::FoldersReload,
        "quota" => Command::Quota,
        "accounts" => Command::AccountsAndIdentities,
        "contacts" => Command::ContactsSync,
        "quit" | "exit" => Command::Shutdown,
        other => bail!("unknown command: {other} (try `help`)"),
    };
    Ok(Some(Line::Command(command)))
}

fn split_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    Some(
        input
            .split_once(char::is_whitespace)
            .map_or((input, ""), |(word, rest)| (word, rest.trim())),
    )
}

fn required<'a>(value: &'a str, what: &str) -> anyhow::Result<&'a str> {
    if value.is_empty() {
        bail!("missing {what}");
    }
    Ok(value)
}

fn parse_uid(value: &str) -> anyhow::Result<Uid> {
    value
        .trim()
        .parse::<u32>()
        .map(Uid)
        .with_context(|| format!("invalid uid: {value}"))
}

fn parse_uids(value: &str) -> anyhow::Result<Vec<Uid>> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(parse_uid)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn command(line: &str) -> Command {
        match parse(line).unwrap() {
            Some(Line::Command(command)) => command,
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_and_meta_lines() {
        assert_eq!(parse("   ").unwrap(), None);
        assert_eq!(parse("yes").unwrap(), Some(Line::Confirm));
        assert_eq!(parse("help").unwrap(), Some(Line::Help));
    }

    #[test]
    fn test_move_and_copy() {
        assert_eq!(
            command("move INBOX Archive 1,2,3"),
            Command::MoveMessages {
                from: "INBOX".into(),
                uids: vec![Uid(1), Uid(2), Uid(3)],
                to: "Archive".into(),
                copy: false,
            }
        );
        assert!(matches!(command("copy INBOX Work 9"), Command::MoveMessages { copy: true, .. }));
        assert!(parse("move INBOX Archive").is_err());
        assert!(parse("move INBOX Archive x").is_err());
    }

    #[test]
    fn test_delete_kinds() {
        assert_eq!(
            command("ham Spam 4"),
            Command::DeleteMessages {
                kind: DeleteKind::NotSpam,
                folder: "Spam".into(),
                uids: vec![Uid(4)],
                use_folder: true,
            }
        );
        assert_eq!(command("delete"), Command::DeleteWithoutMove);
    }

    #[test]
    fn test_flag_actions() {
        assert_eq!(
            command("seen INBOX"),
            Command::SetAction {
                folder: "INBOX".into(),
                action: SetAction::SetSeen,
                uids: None,
            }
        );
        assert_eq!(
            command("unflag INBOX 5,6"),
            Command::SetAction {
                folder: "INBOX".into(),
                action: SetAction::UnsetFlag,
                uids: Some(vec![Uid(5), Uid(6)]),
            }
        );
        assert_eq!(
            command("unseen-all INBOX"),
            Command::SetActionForAll {
                folder: "INBOX".into(),
                action: SetAction::UnsetSeen,
            }
        );
    }

    #[test]
    fn test_navigation() {
        assert_eq!(command("open Work/Reports"), Command::OpenFolder("Work/Reports".into()));
        assert_eq!(command("page 3"), Command::SetPage(3));
        assert_eq!(command("search from:bob subject:hi"), Command::SetSearch("from:bob subject:hi".into()));
        assert_eq!(command("select"), Command::Select(None));
        assert_eq!(command("poll"), Command::FolderInformationMultiply);
        assert_eq!(command("poll Sent"), Command::FolderInformation("Sent".into()));
        assert!(parse("page two").is_err());
        assert!(parse("frobnicate").is_err());
    }
}
