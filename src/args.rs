use clap::Parser;
use secrecy::SecretString;
use std::{fmt::Display, str::FromStr};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Address the HTTP server binds to
    #[clap(long, env, default_value = "127.0.0.1")]
    pub host: String,

    /// Port the HTTP server listens on
    #[clap(short, long, env, default_value_t = 8080)]
    pub port: u16,

    /// Store (PostgREST) base URL
    #[clap(long, env)]
    pub store_url: Option<String>,

    /// Store service API key
    #[clap(long, env)]
    pub store_api_key: Option<SecretString>,

    /// Bearer token identifying the administrator
    #[clap(long, env)]
    pub admin_token: Option<SecretString>,

    #[clap(long, env, default_value = "team_developers")]
    pub developers_table: String,

    #[clap(long, env, default_value = "developer_contributions")]
    pub contributions_table: String,

    #[clap(long, env, default_value = "repositories")]
    pub repositories_table: String,

    /// Maximal parallel store requests
    #[clap(long, env, default_value_t = 10, parse(try_from_str=max_store_req_in_range))]
    pub max_store_req: u32,

    /// Store request timeout in seconds
    #[clap(long, env, default_value_t = 10, parse(try_from_str=store_timeout_in_range))]
    pub store_timeout_secs: u64,
}

fn max_store_req_in_range(value: &str) -> clap::Result<u32, String> {
    number_in_range(value, 1, u32::MAX, "max_store_req".to_string())
}

fn store_timeout_in_range(value: &str) -> clap::Result<u64, String> {
    number_in_range(value, 1, 300, "store_timeout_secs".to_string())
}

fn number_in_range<T>(value: &str, min: T, max: T, name: String) -> clap::Result<T, String>
where
    T: FromStr + PartialOrd + Display,
    <T as FromStr>::Err: Display,
{
    value.parse::<T>().map_err(|err| format!("{}", err)).and_then(|value| {
        if value < min || value > max {
            return Err(format!("{} is not in range {} .. {}.", name, min, max));
        }
        Ok(value)
    })
}

#[test]
fn number_in_range_test() {
    assert_eq!(max_store_req_in_range("4"), Ok(4));
    assert!(max_store_req_in_range("0").is_err());
    assert!(store_timeout_in_range("301").is_err());
    assert_eq!(
        store_timeout_in_range("abc"),
        Err("invalid digit found in string".to_string())
    );
}

#[test]
fn defaults_test() {
    let args = Args::try_parse_from(["team_stats"]).unwrap();
    assert_eq!(args.developers_table, "team_developers");
    assert_eq!(args.max_store_req, 10);
}
