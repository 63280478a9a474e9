//! ORDIS - Interactive Shell
//! A Redis-flavoured REPL over the structured store. Configuration comes
//! from `ORDIS_*` environment variables; a background sweeper erases the
//! rows of deleted collections.

use std::io::{self, BufRead, Write};

use ordis::config::Config;
use ordis::error::{OrdisError, Result};
use ordis::store::SharedStore;
use ordis::sweeper::Sweeper;

/// Rendered result of one command.
enum Reply {
    Ok,
    Nil,
    Int(u64),
    Bulk(Vec<u8>),
    Array(Vec<Vec<u8>>),
    Text(String),
    Usage(&'static str),
}

fn render(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => format!("\"{}\"", s),
        Err(_) => "<binary data>".to_string(),
    }
}

fn print_reply(reply: Reply) {
    match reply {
        Reply::Ok => println!("  OK"),
        Reply::Nil => println!("  (nil)"),
        Reply::Int(n) => println!("  (integer) {}", n),
        Reply::Bulk(value) => println!("  {}", render(&value)),
        Reply::Array(items) if items.is_empty() => println!("  (empty)"),
        Reply::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                println!("  {}) {}", i + 1, render(item));
            }
        }
        Reply::Text(text) => {
            for line in text.lines() {
                println!("  {}", line);
            }
        }
        Reply::Usage(usage) => println!("  Usage: {}", usage),
    }
}

fn bytes_args(parts: &[&str]) -> Vec<Vec<u8>> {
    parts.iter().map(|p| p.as_bytes().to_vec()).collect()
}

fn parse<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| OrdisError::InvalidArgument(format!("{} is not a valid {}", raw, what)))
}

fn parse_bound(raw: &str) -> Result<f64> {
    match raw {
        "-inf" => Ok(f64::NEG_INFINITY),
        "+inf" | "inf" => Ok(f64::INFINITY),
        _ => parse(raw, "score"),
    }
}

fn optional(value: Option<Vec<u8>>) -> Reply {
    value.map_or(Reply::Nil, Reply::Bulk)
}

fn dispatch(shared: &SharedStore, sweeper: &Sweeper, parts: &[&str]) -> Result<Reply> {
    let args = &parts[1..];
    let reply = match (parts[0].to_lowercase().as_str(), args) {
        ("set", [key, _, ..]) => {
            let value = args[1..].join(" ");
            shared.set(key.as_bytes(), value.as_bytes())?;
            Reply::Ok
        }
        ("set", _) => Reply::Usage("set <key> <value>"),
        ("get", [key]) => optional(shared.get(key.as_bytes())?),
        ("get", _) => Reply::Usage("get <key>"),
        ("del", [key]) => Reply::Int(shared.del(key.as_bytes())? as u64),
        ("del", _) => Reply::Usage("del <key>"),
        ("type", [key]) => {
            let kind = shared.read(|s| s.key_type(key.as_bytes()))?;
            Reply::Text(kind.map_or("none", |t| t.name()).to_string())
        }
        ("type", _) => Reply::Usage("type <key>"),

        ("hset", [key, field, value]) => {
            Reply::Int(shared.hset(key.as_bytes(), field.as_bytes(), value.as_bytes())? as u64)
        }
        ("hset", _) => Reply::Usage("hset <key> <field> <value>"),
        ("hget", [key, field]) => optional(shared.hget(key.as_bytes(), field.as_bytes())?),
        ("hget", _) => Reply::Usage("hget <key> <field>"),
        ("hdel", [key, fields @ ..]) if !fields.is_empty() => {
            let fields = bytes_args(fields);
            Reply::Int(shared.write(|s| s.hdel(key.as_bytes(), &fields))? as u64)
        }
        ("hdel", _) => Reply::Usage("hdel <key> <field> [field ...]"),
        ("hgetall", [key]) => {
            let pairs = shared.read(|s| s.hgetall(key.as_bytes()))?;
            Reply::Array(pairs.into_iter().flat_map(|(f, v)| [f, v]).collect())
        }
        ("hgetall", _) => Reply::Usage("hgetall <key>"),
        ("hlen", [key]) => Reply::Int(shared.read(|s| s.hlen(key.as_bytes()))?),
        ("hlen", _) => Reply::Usage("hlen <key>"),
        ("hsetnx", [key, field, value]) => {
            let written =
                shared.write(|s| s.hsetnx(key.as_bytes(), field.as_bytes(), value.as_bytes()))?;
            Reply::Int(written as u64)
        }
        ("hsetnx", _) => Reply::Usage("hsetnx <key> <field> <value>"),
        ("hmset", [key, rest @ ..]) if !rest.is_empty() && rest.len() % 2 == 0 => {
            let pairs: Vec<(Vec<u8>, Vec<u8>)> = rest
                .chunks(2)
                .map(|pair| (pair[0].as_bytes().to_vec(), pair[1].as_bytes().to_vec()))
                .collect();
            shared.write(|s| s.hmset(key.as_bytes(), &pairs))?;
            Reply::Ok
        }
        ("hmset", _) => Reply::Usage("hmset <key> <field> <value> [field value ...]"),
        ("hmget", [key, fields @ ..]) if !fields.is_empty() => {
            let fields = bytes_args(fields);
            let values = shared.read(|s| s.hmget(key.as_bytes(), &fields))?;
            Reply::Text(
                values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| match v {
                        Some(v) => format!("{}) {}", i + 1, render(v)),
                        None => format!("{}) (nil)", i + 1),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        }
        ("hmget", _) => Reply::Usage("hmget <key> <field> [field ...]"),
        ("hexists", [key, field]) => {
            Reply::Int(shared.read(|s| s.hexists(key.as_bytes(), field.as_bytes()))? as u64)
        }
        ("hexists", _) => Reply::Usage("hexists <key> <field>"),
        ("hkeys", [key]) => Reply::Array(shared.read(|s| s.hkeys(key.as_bytes()))?),
        ("hkeys", _) => Reply::Usage("hkeys <key>"),
        ("hvals", [key]) => Reply::Array(shared.read(|s| s.hvals(key.as_bytes()))?),
        ("hvals", _) => Reply::Usage("hvals <key>"),
        ("hscan", [key, start, end, limit]) => {
            let limit = parse::<usize>(limit, "limit")?;
            // "" on the command line leaves a side open
            let open = |raw: &str| if raw == "\"\"" { Vec::new() } else { raw.as_bytes().to_vec() };
            let (start, end) = (open(*start), open(*end));
            let pairs = shared.read(|s| s.hscan(key.as_bytes(), &start, &end, limit))?;
            Reply::Array(pairs.into_iter().flat_map(|(f, v)| [f, v]).collect())
        }
        ("hscan", _) => Reply::Usage("hscan <key> <start> <end> <limit>"),

        ("sadd", [key, members @ ..]) if !members.is_empty() => {
            Reply::Int(shared.sadd(key.as_bytes(), &bytes_args(members))? as u64)
        }
        ("sadd", _) => Reply::Usage("sadd <key> <member> [member ...]"),
        ("srem", [key, members @ ..]) if !members.is_empty() => {
            let members = bytes_args(members);
            Reply::Int(shared.write(|s| s.srem(key.as_bytes(), &members))? as u64)
        }
        ("srem", _) => Reply::Usage("srem <key> <member> [member ...]"),
        ("smembers", [key]) => Reply::Array(shared.read(|s| s.smembers(key.as_bytes()))?),
        ("smembers", _) => Reply::Usage("smembers <key>"),
        ("scard", [key]) => Reply::Int(shared.read(|s| s.scard(key.as_bytes()))?),
        ("scard", _) => Reply::Usage("scard <key>"),

        ("zadd", [key, score, member]) => {
            let score = parse::<f64>(score, "score")?;
            Reply::Int(shared.write(|s| s.zadd(key.as_bytes(), member.as_bytes(), score))? as u64)
        }
        ("zadd", _) => Reply::Usage("zadd <key> <score> <member>"),
        ("zscore", [key, member]) => {
            match shared.read(|s| s.zscore(key.as_bytes(), member.as_bytes()))? {
                Some(score) => Reply::Text(score.to_string()),
                None => Reply::Nil,
            }
        }
        ("zscore", _) => Reply::Usage("zscore <key> <member>"),
        ("zrem", [key, members @ ..]) if !members.is_empty() => {
            let members = bytes_args(members);
            Reply::Int(shared.write(|s| s.zrem(key.as_bytes(), &members))? as u64)
        }
        ("zrem", _) => Reply::Usage("zrem <key> <member> [member ...]"),
        ("zrange", [key, min, max, rest @ ..]) if rest.len() <= 1 => {
            let (min, max) = (parse_bound(min)?, parse_bound(max)?);
            let limit = match rest.first() {
                Some(raw) => parse::<usize>(raw, "limit")?,
                None => usize::MAX,
            };
            let rows = shared.read(|s| s.zrange_by_score(key.as_bytes(), min, max, limit))?;
            Reply::Text(
                rows.iter()
                    .map(|(member, score)| format!("{} {}", render(member), score))
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        }
        ("zrange", _) => Reply::Usage("zrange <key> <min> <max> [limit]"),
        ("zcard", [key]) => Reply::Int(shared.read(|s| s.zcard(key.as_bytes()))?),
        ("zcard", _) => Reply::Usage("zcard <key>"),

        ("lpush", [key, values @ ..]) if !values.is_empty() => {
            let values = bytes_args(values);
            Reply::Int(shared.write(|s| s.lpush(key.as_bytes(), &values))?)
        }
        ("lpush", _) => Reply::Usage("lpush <key> <value> [value ...]"),
        ("rpush", [key, values @ ..]) if !values.is_empty() => {
            Reply::Int(shared.rpush(key.as_bytes(), &bytes_args(values))?)
        }
        ("rpush", _) => Reply::Usage("rpush <key> <value> [value ...]"),
        ("lpop", [key]) => optional(shared.write(|s| s.lpop(key.as_bytes()))?),
        ("lpop", _) => Reply::Usage("lpop <key>"),
        ("rpop", [key]) => optional(shared.write(|s| s.rpop(key.as_bytes()))?),
        ("rpop", _) => Reply::Usage("rpop <key>"),
        ("lrange", [key, start, stop]) => {
            let (start, stop) = (parse::<i64>(start, "index")?, parse::<i64>(stop, "index")?);
            Reply::Array(shared.read(|s| s.lrange(key.as_bytes(), start, stop))?)
        }
        ("lrange", _) => Reply::Usage("lrange <key> <start> <stop>"),
        ("llen", [key]) => Reply::Int(shared.read(|s| s.llen(key.as_bytes()))?),
        ("llen", _) => Reply::Usage("llen <key>"),

        ("sweep", []) => {
            let stats = sweeper.sweep_shared(shared)?;
            Reply::Text(format!(
                "markers: {}\nstale:   {}\nfailed:  {}\nrows:    {}",
                stats.markers, stats.stale, stats.failed, stats.rows
            ))
        }
        ("info", []) => {
            let (rows, bytes) = shared.read(|s| Ok((s.engine().len(), s.engine().size_bytes())))?;
            let report = shared.with_metrics(|m| m.report())?;
            Reply::Text(format!("rows:      {}\nsize:      {} bytes\n{}", rows, bytes, report))
        }
        (cmd, _) => Reply::Text(format!("Unknown command: '{}'. Type 'exit' to quit.", cmd)),
    };
    Ok(reply)
}

fn main() {
    env_logger::init();

    println!();
    println!("  ╔═══════════════════════════════════════════╗");
    println!("  ║            ORDIS Structured Store         ║");
    println!("  ║   strings · hashes · sets · zsets · lists ║");
    println!("  ╚═══════════════════════════════════════════╝");
    println!();
    println!("  Commands:");
    println!("    set/get/del/type");
    println!("    hset/hget/hdel/hgetall/hlen/hexists");
    println!("    hsetnx/hmset/hmget/hkeys/hvals/hscan");
    println!("    sadd/srem/smembers/scard");
    println!("    zadd/zscore/zrem/zrange/zcard");
    println!("    lpush/rpush/lpop/rpop/lrange/llen");
    println!("    sweep              - Erase rows of deleted collections now");
    println!("    info               - Show store statistics");
    println!("    exit               - Shutdown");
    println!();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("[ERROR] Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };
    let sweeper = Sweeper::from_config(&config);
    let interval = config.sweep_interval;

    let shared = match SharedStore::open(config) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("[ERROR] Failed to open store: {}", err);
            std::process::exit(1);
        }
    };
    let background = match sweeper.spawn(shared.clone(), interval) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("[WARN] Background sweeper unavailable: {}", err);
            None
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("ordis> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break, // EOF
            Ok(_) => {}
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if matches!(parts[0].to_lowercase().as_str(), "exit" | "quit" | "q") {
            println!("  Shutting down ORDIS...");
            break;
        }

        match dispatch(&shared, &sweeper, &parts) {
            Ok(reply) => print_reply(reply),
            Err(err) => println!("  ERROR: {}", err),
        }
    }

    if let Some(handle) = background {
        if let Err(err) = handle.stop() {
            eprintln!("[ERROR] {}", err);
        }
    }
}
