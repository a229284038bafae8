use std::error::Error;

use dotenv::dotenv;
use structopt::StructOpt;

use dojo::account::Privilege;
use dojo::config::get_variable;
use dojo::db::{Db, PgDb};
use dojo::normalization::normalize_email;
use log::{debug, info, initialize_logger, o};

#[derive(Debug, StructOpt)]
#[structopt(name = "manage", about = "Inspect and adjust member accounts")]
enum Opt {
    /// Print every account with its membership and admin level
    List,

    /// Change the admin level of the account with the given email
    SetAdmin {
        email: String,

        /// One of `no`, `test`, `read` or `read-write`
        #[structopt(parse(try_from_str))]
        level: Privilege,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let opt = Opt::from_args();

    let logger = initialize_logger();

    let connection_string = get_variable("BACKEND_DB_CONNECTION_STRING");
    let pool = sqlx::PgPool::connect(&connection_string).await?;
    let db = PgDb::new(pool);

    match opt {
        Opt::List => {
            debug!(logger, "Retrieving accounts...");

            for account in db.retrieve_accounts().await? {
                println!(
                    "{}\t{}\t{}\tmembership={}\tcoach={}\tadmin={}",
                    account.id,
                    account.email,
                    account.full_name(),
                    account.membership_id,
                    account.is_coach,
                    account.admin
                );
            }
        }
        Opt::SetAdmin { email, level } => {
            let email = normalize_email(&email);
            let logger = logger.new(o!("email" => email.clone()));

            let (id, _) = db
                .retrieve_credentials(&email)
                .await?
                .ok_or_else(|| format!("no account for {}", email))?;

            db.set_admin(id, level).await?;

            info!(logger, "Set admin level"; "account_id" => id, "admin" => %level);
        }
    }

    Ok(())
}
