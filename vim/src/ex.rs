//! The command-line commands the engine executes itself: the `:map`
//! family, `:set` and `:{N}`. Everything else goes back to the host.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::mapping::{MapMode, MappingInfo, SharedMappings};
use crate::notation::parse_keys_with_leader;
use crate::options::SharedOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExOutcome {
    Done,
    /// Text for the host to show (listings, `:set sw?`).
    Message(String),
    /// `:{N}`, 1-based.
    GotoLine(usize),
    /// Not ours; the host runs it.
    Host(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapCommand {
    Map { recursive: bool },
    Unmap,
    Clear,
}

/// `<buffer>`, `<nowait>`, ... given before the lhs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct MapArguments {
    buffer: bool,
    nowait: bool,
    silent: bool,
    special: bool,
    expr: bool,
    unique: bool,
}

// (name, shortest accepted abbreviation, command, modes)
const MAP_COMMANDS: &[(&str, usize, MapCommand, MapMode)] = {
    use MapCommand::{Clear, Map, Unmap};
    const R: MapCommand = Map { recursive: true };
    const NR: MapCommand = Map { recursive: false };
    &[
        ("map", 3, R, MapMode::NVO),
        ("noremap", 2, NR, MapMode::NVO),
        ("unmap", 3, Unmap, MapMode::NVO),
        ("mapclear", 4, Clear, MapMode::NVO),
        ("nmap", 2, R, MapMode::NORMAL),
        ("nnoremap", 2, NR, MapMode::NORMAL),
        ("nunmap", 3, Unmap, MapMode::NORMAL),
        ("nmapclear", 5, Clear, MapMode::NORMAL),
        ("vmap", 2, R, MapMode::VISUAL_SELECT),
        ("vnoremap", 2, NR, MapMode::VISUAL_SELECT),
        ("vunmap", 2, Unmap, MapMode::VISUAL_SELECT),
        ("vmapclear", 5, Clear, MapMode::VISUAL_SELECT),
        ("xmap", 2, R, MapMode::VISUAL),
        ("xnoremap", 2, NR, MapMode::VISUAL),
        ("xunmap", 2, Unmap, MapMode::VISUAL),
        ("xmapclear", 5, Clear, MapMode::VISUAL),
        ("smap", 4, R, MapMode::SELECT),
        ("snoremap", 4, NR, MapMode::SELECT),
        ("sunmap", 4, Unmap, MapMode::SELECT),
        ("smapclear", 5, Clear, MapMode::SELECT),
        ("omap", 2, R, MapMode::OP_PENDING),
        ("onoremap", 3, NR, MapMode::OP_PENDING),
        ("ounmap", 2, Unmap, MapMode::OP_PENDING),
        ("omapclear", 5, Clear, MapMode::OP_PENDING),
        ("imap", 2, R, MapMode::INSERT),
        ("inoremap", 3, NR, MapMode::INSERT),
        ("iunmap", 2, Unmap, MapMode::INSERT),
        ("imapclear", 5, Clear, MapMode::INSERT),
        ("cmap", 2, R, MapMode::CMD_LINE),
        ("cnoremap", 3, NR, MapMode::CMD_LINE),
        ("cunmap", 2, Unmap, MapMode::CMD_LINE),
        ("cmapclear", 5, Clear, MapMode::CMD_LINE),
    ]
};

fn map_command(name: &str) -> Option<(MapCommand, MapMode)> {
    let (name, bang) = match name.strip_suffix('!') {
        Some(stripped) => (stripped, true),
        None => (name, false),
    };
    let &(_, _, command, modes) = MAP_COMMANDS
        .iter()
        .find(|(full, min, _, _)| name.len() >= *min && full.starts_with(name))?;
    match (bang, modes) {
        // `:map!` and friends cover Insert and Command-line mode.
        (true, MapMode::NVO) => Some((command, MapMode::INSERT_CMD_LINE)),
        (true, _) => None,
        (false, _) => Some((command, modes)),
    }
}

/// Runs one command line (without the leading `:`).
pub fn execute(line: &str, mappings: &SharedMappings, options: &SharedOptions) -> Result<ExOutcome> {
    let line = line.trim_start_matches([':', ' ', '\t']);
    if line.trim().is_empty() {
        return Ok(ExOutcome::Done);
    }
    if let Ok(n) = line.trim().parse::<usize>() {
        return Ok(ExOutcome::GotoLine(n));
    }
    let split = line
        .find(|c: char| !(c.is_ascii_alphabetic() || c == '!'))
        .unwrap_or(line.len());
    let (name, rest) = line.split_at(split);
    if name == "set" || name == "se" {
        return set(rest, options);
    }
    match map_command(name) {
        Some((command, modes)) => map(command, modes, rest, mappings, options),
        None => {
            debug!(command = line, "passing command to host");
            Ok(ExOutcome::Host(line.to_string()))
        }
    }
}

fn set(args: &str, options: &SharedOptions) -> Result<ExOutcome> {
    let mut shown = Vec::new();
    for arg in args.split_whitespace() {
        if let Some(name) = arg.strip_suffix('?') {
            let value = options.read().get(name)?;
            shown.push(format!("{name}={value}"));
        } else {
            options.write().set(arg)?;
        }
    }
    if shown.is_empty() {
        Ok(ExOutcome::Done)
    } else {
        Ok(ExOutcome::Message(shown.join("\n")))
    }
}

fn parse_arguments(mut rest: &str) -> Result<(MapArguments, &str)> {
    let mut args = MapArguments::default();
    loop {
        rest = rest.trim_start();
        let Some(end) = rest.find('>').filter(|_| rest.starts_with('<')) else {
            break;
        };
        let flag = match rest[1..end].to_ascii_lowercase().as_str() {
            "buffer" => &mut args.buffer,
            "nowait" => &mut args.nowait,
            "silent" => &mut args.silent,
            "special" => &mut args.special,
            "expr" => &mut args.expr,
            "unique" => &mut args.unique,
            "script" => return Err(Error::UnsupportedMappingArgument("<script>".to_string())),
            _ => break,
        };
        *flag = true;
        rest = &rest[end + 1..];
    }
    Ok((args, rest))
}

fn map(
    command: MapCommand,
    modes: MapMode,
    rest: &str,
    mappings: &SharedMappings,
    options: &SharedOptions,
) -> Result<ExOutcome> {
    if command == MapCommand::Clear {
        mappings.write().clear(modes);
        return Ok(ExOutcome::Done);
    }
    let (args, rest) = parse_arguments(rest)?;
    let leader = options.read().mapleader.clone();
    let (lhs, rhs) = match rest.find(char::is_whitespace) {
        Some(i) => (&rest[..i], rest[i..].trim_start()),
        None => (rest, ""),
    };
    let lhs_keys = parse_keys_with_leader(lhs, &leader)?;

    match command {
        MapCommand::Unmap => {
            if lhs_keys.is_empty() {
                return Err(Error::InvalidMapping("missing lhs".to_string()));
            }
            mappings.write().remove(modes, &lhs_keys)?;
            Ok(ExOutcome::Done)
        }
        MapCommand::Map { .. } if rhs.is_empty() => {
            let lines = mappings.read().list(modes, &lhs_keys);
            if lines.is_empty() {
                Ok(ExOutcome::Message("No mapping found".to_string()))
            } else {
                Ok(ExOutcome::Message(lines.join("\n")))
            }
        }
        MapCommand::Map { recursive } => {
            let mut table = mappings.write();
            if args.unique && table.contains(modes, &lhs_keys) {
                return Err(Error::InvalidMapping(format!("mapping already exists for {lhs}")));
            }
            let mut info = if args.expr {
                MappingInfo::expression(lhs_keys, rhs, modes, recursive)
            } else {
                let mut info = MappingInfo::keys(lhs_keys, parse_keys_with_leader(rhs, &leader)?, modes, recursive);
                info.rhs_text = rhs.to_string();
                info
            };
            info.silent = args.silent;
            info = info.with_nowait(args.nowait);
            info!(lhs, rhs, recursive, buffer = args.buffer, "map");
            table.add(info)?;
            Ok(ExOutcome::Done)
        }
        MapCommand::Clear => Ok(ExOutcome::Done),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyEvent;
    use crate::mapping::{MappingTable, MappingTarget, Resolution};
    use crate::notation::parse_keys;
    use crate::options::Options;

    fn setup() -> (SharedMappings, SharedOptions) {
        (MappingTable::new().shared(), std::sync::Arc::new(parking_lot::RwLock::new(Options::default())))
    }

    fn keys(s: &str) -> Vec<KeyEvent> {
        parse_keys(s).unwrap()
    }

    #[test]
    fn command_names() {
        assert_eq!(map_command("map"), Some((MapCommand::Map { recursive: true }, MapMode::NVO)));
        assert_eq!(map_command("nnoremap"), Some((MapCommand::Map { recursive: false }, MapMode::NORMAL)));
        assert_eq!(map_command("nn"), Some((MapCommand::Map { recursive: false }, MapMode::NORMAL)));
        assert_eq!(map_command("nmap"), Some((MapCommand::Map { recursive: true }, MapMode::NORMAL)));
        assert_eq!(map_command("vunmap"), Some((MapCommand::Unmap, MapMode::VISUAL_SELECT)));
        assert_eq!(map_command("map!"), Some((MapCommand::Map { recursive: true }, MapMode::INSERT_CMD_LINE)));
        assert_eq!(map_command("noremap!"), Some((MapCommand::Map { recursive: false }, MapMode::INSERT_CMD_LINE)));
        assert_eq!(map_command("imapclear"), Some((MapCommand::Clear, MapMode::INSERT)));
        assert_eq!(map_command("inoremap"), Some((MapCommand::Map { recursive: false }, MapMode::INSERT)));
        assert_eq!(map_command("write"), None);
    }

    #[test]
    fn map_and_unmap() {
        let (mappings, options) = setup();
        execute("nnoremap <silent> <nowait> jj <Esc>", &mappings, &options).unwrap();
        match mappings.read().resolve(MapMode::NORMAL, &keys("jj")) {
            Resolution::Mapped(info) => {
                assert!(info.silent && info.nowait && !info.recursive);
                assert_eq!(info.target, MappingTarget::Keys(keys("<Esc>")));
            }
            other => panic!("unexpected {other:?}"),
        }
        execute("nunmap jj", &mappings, &options).unwrap();
        assert!(matches!(
            execute("nunmap jj", &mappings, &options),
            Err(Error::NoMapping(_))
        ));
    }

    #[test]
    fn special_arguments() {
        let (mappings, options) = setup();
        assert_eq!(
            execute("map <script> x y", &mappings, &options),
            Err(Error::UnsupportedMappingArgument("<script>".into()))
        );
        execute("map <expr> x MyFunc()", &mappings, &options).unwrap();
        let table = mappings.read();
        match table.resolve(MapMode::NORMAL, &keys("x")) {
            Resolution::Mapped(info) => {
                assert_eq!(info.target, MappingTarget::Expression("MyFunc()".into()))
            }
            other => panic!("unexpected {other:?}"),
        }
        drop(table);
        assert!(matches!(
            execute("map <unique> x z", &mappings, &options),
            Err(Error::InvalidMapping(_))
        ));
    }

    #[test]
    fn leader_and_listing() {
        let (mappings, options) = setup();
        execute("set mapleader=,", &mappings, &options).unwrap();
        execute("nmap <Leader>w :write<CR>", &mappings, &options).unwrap();
        assert!(mappings.read().contains(MapMode::NORMAL, &keys(",w")));
        let ExOutcome::Message(listing) = execute("nmap ,", &mappings, &options).unwrap() else {
            panic!("expected a listing");
        };
        assert!(listing.contains(":write<CR>"));
        assert_eq!(
            execute("imap ,", &mappings, &options).unwrap(),
            ExOutcome::Message("No mapping found".into())
        );
    }

    #[test]
    fn set_and_query() {
        let (mappings, options) = setup();
        assert_eq!(execute("set sw=4 et", &mappings, &options), Ok(ExOutcome::Done));
        assert_eq!(
            execute("set sw? et?", &mappings, &options),
            Ok(ExOutcome::Message("sw=4\net=true".into()))
        );
        assert!(matches!(execute("set bogus", &mappings, &options), Err(Error::UnknownOption(_))));
    }

    #[test]
    fn other_commands() {
        let (mappings, options) = setup();
        assert_eq!(execute(":42", &mappings, &options), Ok(ExOutcome::GotoLine(42)));
        assert_eq!(execute("w file.txt", &mappings, &options), Ok(ExOutcome::Host("w file.txt".into())));
        assert_eq!(execute("", &mappings, &options), Ok(ExOutcome::Done));
    }
}
