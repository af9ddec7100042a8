use std::cell::RefCell;

use injectable::*;
use tracing_subscriber::EnvFilter;

// Regular collaborators

#[derive(Clone, Debug)]
struct Player {
    id: u32,
    name: String,
}

#[derive(Debug)]
struct Team {
    capacity: usize,
    roster: RefCell<Vec<Player>>,
}

impl Team {
    fn accepts_players(&self) -> bool {
        self.roster.borrow().len() < self.capacity
    }
}

#[derive(Default)]
struct TeamQuery;

impl TeamQuery {
    fn find(&self, id: u32) -> Option<Team> {
        (id == 1).then(|| Team {
            capacity: 2,
            roster: RefCell::default(),
        })
    }
}

#[derive(Default)]
struct UserQuery;

impl UserQuery {
    fn find(&self, id: u32) -> Option<Player> {
        (id < 100).then(|| Player {
            id,
            name: format!("player-{id}"),
        })
    }
}

fn main() -> Result<(), InjectError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Classes known by name
    let registry = ClassRegistry::new();
    registry
        .register(ClassDef::default_of::<TeamQuery>("TeamQuery"))
        .register(ClassDef::default_of::<UserQuery>("UserQuery"));

    // `team_query` is resolved by convention, `player_query` uses an explicit class
    let add_player = ServiceDefinition::builder("AddPlayerToTeamRoster", &registry)
        .dependency("team_query", DependencyOptions::new())?
        .dependency("player_query", DependencyOptions::new().class("UserQuery"))?
        .argument("team_id", ArgumentOptions::required())
        .argument("player_id", ArgumentOptions::required())
        .call(|s| {
            let player_id = *s.argument_as::<u32>("player_id")?;
            let team_id = *s.argument_as::<u32>("team_id")?;
            let player = s
                .dependency_as::<UserQuery>("player_query")?
                .find(player_id)
                .ok_or(format!("player {player_id} not found"));
            let team = s
                .dependency_as::<TeamQuery>("team_query")?
                .find(team_id)
                .ok_or(format!("team {team_id} not found"));

            Ok(player.and_then(|player| {
                let team = team?;
                if !team.accepts_players() {
                    return Err("team is full".to_string());
                }
                team.roster.borrow_mut().push(player.clone());
                Ok(player)
            }))
        })
        .build();

    let added = ServiceDefinition::call_as::<Result<Player, String>>(
        &add_player,
        Args::new().kwarg("team_id", 1u32).kwarg("player_id", 7u32),
    )?;
    println!("added: {:?}", added);

    let missing = ServiceDefinition::call_as::<Result<Player, String>>(
        &add_player,
        Args::new().kwarg("team_id", 2u32).kwarg("player_id", 7u32),
    )?;
    println!("missing team: {:?}", missing);

    // A forgotten argument is reported before the service runs
    if let Err(e) = ServiceDefinition::call(&add_player, Args::new().kwarg("team_id", 1u32)) {
        println!("error: {e}");
    }

    if let Ok(player) = added.as_ref() {
        println!("{} joined with id {}", player.name, player.id);
    }

    Ok(())
}
