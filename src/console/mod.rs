// 🐚 Console - line-oriented command interpreter over a storage backend
//
// Every command writes its result (or one of the fixed `** ... **` messages)
// to the output. Storage failures are returned from onecmd() as errors.

pub mod parse;

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::entities::{Entity, EntityKind};
use crate::entities::base::py_repr;
use crate::storage::Storage;
use parse::{parse_call, parse_param, split_args, Arg};

pub const PROMPT: &str = "(hbnb) ";

pub const CLASS_MISSING: &str = "** class name missing **";
pub const CLASS_UNKNOWN: &str = "** class doesn't exist **";
pub const ID_MISSING: &str = "** instance id missing **";
pub const NOT_FOUND: &str = "** no instance found **";
pub const ATTRIBUTE_MISSING: &str = "** attribute name missing **";
pub const VALUE_MISSING: &str = "** value missing **";

/// Documented commands and their help text, in the order `help` lists them
const COMMANDS: &[(&str, &str)] = &[
    ("EOF", "Exit the console on end of input."),
    ("all", "Print every instance, or every instance of a class.\n  all [<class>] | <class>.all()"),
    ("count", "Print the number of instances of a class.\n  count <class> | <class>.count()"),
    (
        "create",
        "Create an instance, save it and print its id.\n  create <class> [<key>=<value> ...]",
    ),
    (
        "destroy",
        "Delete an instance by class and id.\n  destroy <class> <id> | <class>.destroy(<id>)",
    ),
    ("help", "List commands, or describe one.\n  help [<command>]"),
    ("quit", "Exit the console."),
    ("show", "Print an instance by class and id.\n  show <class> <id> | <class>.show(<id>)"),
    (
        "update",
        "Set one attribute, or several from a dictionary.\n  update <class> <id> <attribute> <value>\n  <class>.update(<id>, <attribute>, <value>)\n  <class>.update(<id>, {<attribute>: <value>, ...})",
    ),
];

pub struct Console<W: Write> {
    storage: Box<dyn Storage>,
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(storage: Box<dyn Storage>, out: W) -> Self {
        Console { storage, out }
    }

    pub fn storage(&mut self) -> &mut dyn Storage {
        self.storage.as_mut()
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// Close the storage and hand back the output
    pub fn finish(mut self) -> Result<W> {
        self.storage.close().context("closing storage")?;
        Ok(self.out)
    }

    /// Run one command line. Ok(true) means the loop should stop.
    pub fn onecmd(&mut self, line: &str) -> Result<bool> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(false);
        }

        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map(|(verb, rest)| (verb, rest.trim()))
            .unwrap_or((line, ""));

        match verb {
            "quit" => return Ok(true),
            "EOF" => {
                writeln!(self.out)?;
                return Ok(true);
            }
            "help" => self.do_help(rest)?,
            "create" => self.do_create(rest)?,
            "show" => self.do_show(&split_args(rest, false))?,
            "destroy" => self.do_destroy(&split_args(rest, false))?,
            "all" => self.do_all(&split_args(rest, false))?,
            "count" => self.do_count(&split_args(rest, false))?,
            "update" => self.do_update(&split_args(rest, false))?,
            _ => self.default(line)?,
        }

        self.out.flush()?;
        Ok(false)
    }

    /// `<Class>.<verb>(<args>)`, anything else is unknown
    fn default(&mut self, line: &str) -> Result<()> {
        let Some(call) = parse_call(line) else {
            return self.unknown(line);
        };

        let mut args = vec![Arg {
            text: call.class,
            quoted: false,
        }];
        args.extend(call.args);

        match (call.verb.as_str(), call.dict) {
            ("all", None) => self.do_all(&args),
            ("count", None) => self.do_count(&args),
            ("show", None) => self.do_show(&args),
            ("destroy", None) => self.do_destroy(&args),
            ("update", None) => self.do_update(&args),
            ("update", Some(dict)) => self.do_update_dict(&args, dict),
            _ => self.unknown(line),
        }
    }

    fn unknown(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "*** Unknown syntax: {}", line)?;
        Ok(())
    }

    fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "{}", message)?;
        Ok(())
    }

    fn do_help(&mut self, topic: &str) -> Result<()> {
        if topic.is_empty() {
            let names: Vec<&str> = COMMANDS.iter().map(|(name, _)| *name).collect();
            writeln!(self.out)?;
            writeln!(self.out, "Documented commands (type help <topic>):")?;
            writeln!(self.out, "========================================")?;
            writeln!(self.out, "{}", names.join("  "))?;
            writeln!(self.out)?;
            return Ok(());
        }

        match COMMANDS.iter().find(|(name, _)| *name == topic) {
            Some((_, text)) => writeln!(self.out, "{}", text)?,
            None => writeln!(self.out, "*** No help on {}", topic)?,
        }
        Ok(())
    }

    // ========================================================================
    // ARGUMENT CHECKS
    // ========================================================================

    /// First argument as a class, or print why not
    fn class_arg(&mut self, args: &[Arg]) -> Result<Option<EntityKind>> {
        let Some(name) = args.first() else {
            self.say(CLASS_MISSING)?;
            return Ok(None);
        };

        match name.text.parse::<EntityKind>() {
            Ok(kind) => Ok(Some(kind)),
            Err(_) => {
                self.say(CLASS_UNKNOWN)?;
                Ok(None)
            }
        }
    }

    /// Class and id from the first two arguments, looked up in storage
    fn instance_arg(&mut self, args: &[Arg]) -> Result<Option<Entity>> {
        let Some(kind) = self.class_arg(args)? else {
            return Ok(None);
        };
        let Some(id) = args.get(1) else {
            self.say(ID_MISSING)?;
            return Ok(None);
        };

        let found = self
            .storage
            .get(kind, &id.text)
            .with_context(|| format!("looking up {}.{}", kind, id.text))?;
        if found.is_none() {
            self.say(NOT_FOUND)?;
        }
        Ok(found)
    }

    // ========================================================================
    // COMMANDS
    // ========================================================================

    fn do_create(&mut self, rest: &str) -> Result<()> {
        let mut tokens = rest.split_whitespace();
        let Some(name) = tokens.next() else {
            return self.say(CLASS_MISSING);
        };
        let Ok(kind) = name.parse::<EntityKind>() else {
            return self.say(CLASS_UNKNOWN);
        };

        let mut entity = kind.instantiate();
        for token in tokens {
            let Some((key, value)) = parse_param(token) else {
                tracing::warn!(param = token, "skipping malformed parameter");
                continue;
            };
            if let Err(e) = entity.set_attribute(&key, value) {
                tracing::warn!(param = token, error = %e, "skipping parameter");
            }
        }

        entity
            .save(self.storage.as_mut())
            .with_context(|| format!("saving new {}", kind))?;
        writeln!(self.out, "{}", entity.id())?;
        Ok(())
    }

    fn do_show(&mut self, args: &[Arg]) -> Result<()> {
        if let Some(entity) = self.instance_arg(args)? {
            writeln!(self.out, "{}", entity)?;
        }
        Ok(())
    }

    fn do_destroy(&mut self, args: &[Arg]) -> Result<()> {
        let Some(entity) = self.instance_arg(args)? else {
            return Ok(());
        };

        self.storage
            .delete(&entity)
            .and_then(|_| self.storage.save())
            .with_context(|| format!("destroying {}", entity.key()))?;
        Ok(())
    }

    fn do_all(&mut self, args: &[Arg]) -> Result<()> {
        let kind = if args.is_empty() {
            None
        } else {
            match self.class_arg(args)? {
                Some(kind) => Some(kind),
                None => return Ok(()),
            }
        };

        let listed: Vec<Value> = self
            .storage
            .all(kind)
            .context("listing instances")?
            .values()
            .map(|entity| Value::String(entity.to_string()))
            .collect();

        writeln!(self.out, "{}", py_repr(&Value::Array(listed)))?;
        Ok(())
    }

    fn do_count(&mut self, args: &[Arg]) -> Result<()> {
        let Some(kind) = self.class_arg(args)? else {
            return Ok(());
        };

        let count = self.storage.count(Some(kind)).context("counting instances")?;
        writeln!(self.out, "{}", count)?;
        Ok(())
    }

    fn do_update(&mut self, args: &[Arg]) -> Result<()> {
        let Some(mut entity) = self.instance_arg(args)? else {
            return Ok(());
        };
        let Some(name) = args.get(2) else {
            return self.say(ATTRIBUTE_MISSING);
        };
        let Some(value) = args.get(3) else {
            return self.say(VALUE_MISSING);
        };

        if let Err(e) = entity.set_attribute(&name.text, value.to_value()) {
            tracing::warn!(key = %entity.key(), error = %e, "update rejected");
            return Ok(());
        }
        self.save_updated(entity)
    }

    fn do_update_dict(
        &mut self,
        args: &[Arg],
        dict: serde_json::Map<String, Value>,
    ) -> Result<()> {
        let Some(mut entity) = self.instance_arg(args)? else {
            return Ok(());
        };

        for (name, value) in dict {
            if let Err(e) = entity.set_attribute(&name, value) {
                tracing::warn!(key = %entity.key(), error = %e, "update rejected");
            }
        }
        self.save_updated(entity)
    }

    fn save_updated(&mut self, mut entity: Entity) -> Result<()> {
        entity
            .save(self.storage.as_mut())
            .with_context(|| format!("saving {}", entity.key()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
