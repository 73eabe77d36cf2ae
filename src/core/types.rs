//! Team, Mode and Server Region Families
//!
//! Closed enumerations carrying the wire constants the server understands:
//! numeric team codes, mode token pairs, and region host descriptors.
//! Every use site matches exhaustively; parsing from wire values returns
//! `Option` so unknown codes can be skipped without tearing a session down.

/// A team slot inside a room.
///
/// The numeric code is the value carried by team-related wire events.
/// Codes above [`Team::FreeForAll`] only appear when the room has extended
/// teams enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    /// Watching, not playing.
    Spectator,
    /// Free-for-all slot (the default for fresh joins).
    FreeForAll,
    /// Red team.
    Red,
    /// Blue team.
    Blue,
    /// Green team.
    Green,
    /// Yellow team.
    Yellow,
}

impl Team {
    /// Numeric wire code for this team.
    pub fn code(self) -> u8 {
        match self {
            Team::Spectator => 0,
            Team::FreeForAll => 1,
            Team::Red => 2,
            Team::Blue => 3,
            Team::Green => 4,
            Team::Yellow => 5,
        }
    }

    /// Parse a wire code back into a team. Unknown codes yield `None`.
    pub fn from_code(code: u8) -> Option<Team> {
        match code {
            0 => Some(Team::Spectator),
            1 => Some(Team::FreeForAll),
            2 => Some(Team::Red),
            3 => Some(Team::Blue),
            4 => Some(Team::Green),
            5 => Some(Team::Yellow),
            _ => None,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Team::Spectator => "Spectator",
            Team::FreeForAll => "FFA",
            Team::Red => "Red",
            Team::Blue => "Blue",
            Team::Green => "Green",
            Team::Yellow => "Yellow",
        };
        f.write_str(name)
    }
}

/// A game mode.
///
/// Each mode maps to a pair of wire tokens: the game-family token (`ga`)
/// and the short-name token (`mo`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Plain bonking.
    Classic,
    /// Arrows pickups enabled.
    Arrows,
    /// Arrows that eliminate on hit.
    DeathArrows,
    /// Grapple hooks.
    Grapple,
    /// Thrust-based flight.
    Vtol,
    /// Ball and goals.
    Football,
}

impl Mode {
    /// Game-family wire token (`ga`).
    pub fn engine(self) -> &'static str {
        match self {
            Mode::Football => "f",
            _ => "b",
        }
    }

    /// Short-name wire token (`mo`).
    pub fn short_name(self) -> &'static str {
        match self {
            Mode::Classic => "b",
            Mode::Arrows => "ar",
            Mode::DeathArrows => "ard",
            Mode::Grapple => "sp",
            Mode::Vtol => "v",
            Mode::Football => "f",
        }
    }

    /// Parse a short-name wire token back into a mode.
    pub fn from_short_name(token: &str) -> Option<Mode> {
        match token {
            "b" => Some(Mode::Classic),
            "ar" => Some(Mode::Arrows),
            "ard" => Some(Mode::DeathArrows),
            "sp" => Some(Mode::Grapple),
            "v" => Some(Mode::Vtol),
            "f" => Some(Mode::Football),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mode::Classic => "Classic",
            Mode::Arrows => "Arrows",
            Mode::DeathArrows => "Death Arrows",
            Mode::Grapple => "Grapple",
            Mode::Vtol => "VTOL",
            Mode::Football => "Football",
        };
        f.write_str(name)
    }
}

/// A game server region.
///
/// Carries the host token used to build the socket address plus the
/// coordinates and country code the create-room handshake reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ServerRegion {
    Warsaw,
    Stockholm,
    Frankfurt,
    London,
    Seoul,
    Seattle,
    SanFrancisco,
    Mississippi,
    Dallas,
    NewYork,
    Atlanta,
    Sydney,
    Brazil,
}

impl ServerRegion {
    /// Wire host token, e.g. `b2warsaw1`.
    pub fn host(self) -> &'static str {
        match self {
            ServerRegion::Warsaw => "b2warsaw1",
            ServerRegion::Stockholm => "b2stockholm1",
            ServerRegion::Frankfurt => "b2frankfurt1",
            ServerRegion::London => "b2london1",
            ServerRegion::Seoul => "b2seoul1",
            ServerRegion::Seattle => "b2seattle1",
            ServerRegion::SanFrancisco => "b2sanfrancisco1",
            ServerRegion::Mississippi => "b2river1",
            ServerRegion::Dallas => "b2dallas1",
            ServerRegion::NewYork => "b2ny1",
            ServerRegion::Atlanta => "b2atlanta1",
            ServerRegion::Sydney => "b2sydney1",
            ServerRegion::Brazil => "b2brazil1",
        }
    }

    /// Latitude reported by the create-room handshake.
    pub fn latitude(self) -> f64 {
        match self {
            ServerRegion::Warsaw => 52.2370,
            ServerRegion::Stockholm => 59.3346,
            ServerRegion::Frankfurt => 50.1109,
            ServerRegion::London => 51.5098,
            ServerRegion::Seoul => 37.5326,
            ServerRegion::Seattle => 47.6080,
            ServerRegion::SanFrancisco => 37.7740,
            ServerRegion::Mississippi => 35.5147,
            ServerRegion::Dallas => 32.7792,
            ServerRegion::NewYork => 40.7306,
            ServerRegion::Atlanta => 33.7537,
            ServerRegion::Sydney => -33.8651,
            ServerRegion::Brazil => -22.9083,
        }
    }

    /// Longitude reported by the create-room handshake.
    pub fn longitude(self) -> f64 {
        match self {
            ServerRegion::Warsaw => 21.0175,
            ServerRegion::Stockholm => 18.0632,
            ServerRegion::Frankfurt => 8.6821,
            ServerRegion::London => -0.1180,
            ServerRegion::Seoul => 127.0246,
            ServerRegion::Seattle => -122.3352,
            ServerRegion::SanFrancisco => -122.4312,
            ServerRegion::Mississippi => -89.9125,
            ServerRegion::Dallas => -96.8089,
            ServerRegion::NewYork => -73.9352,
            ServerRegion::Atlanta => -84.3863,
            ServerRegion::Sydney => 151.2099,
            ServerRegion::Brazil => -43.1963,
        }
    }

    /// Country code reported by the create-room handshake.
    pub fn country(self) -> &'static str {
        match self {
            ServerRegion::Warsaw => "PL",
            ServerRegion::Stockholm => "SE",
            ServerRegion::Frankfurt => "GE",
            ServerRegion::London => "UK",
            ServerRegion::Seoul => "KR",
            ServerRegion::Seattle
            | ServerRegion::SanFrancisco
            | ServerRegion::Mississippi
            | ServerRegion::Dallas
            | ServerRegion::NewYork
            | ServerRegion::Atlanta => "US",
            ServerRegion::Sydney => "AU",
            ServerRegion::Brazil => "BR",
        }
    }

    /// Full socket address for this region.
    pub fn socket_address(self) -> String {
        socket_address_for(self.host())
    }
}

/// Build the socket address for a region host token.
///
/// Join flows receive the host token from the room lookup collaborator
/// rather than a [`ServerRegion`] value.
pub fn socket_address_for(host: &str) -> String {
    format!("wss://{host}.bonk.io/socket.io/?EIO=3&transport=websocket")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_codes_round_trip() {
        let teams = [
            Team::Spectator,
            Team::FreeForAll,
            Team::Red,
            Team::Blue,
            Team::Green,
            Team::Yellow,
        ];
        for team in teams {
            assert_eq!(Team::from_code(team.code()), Some(team));
        }
        assert_eq!(Team::from_code(6), None);
    }

    #[test]
    fn test_mode_tokens_round_trip() {
        let modes = [
            Mode::Classic,
            Mode::Arrows,
            Mode::DeathArrows,
            Mode::Grapple,
            Mode::Vtol,
            Mode::Football,
        ];
        for mode in modes {
            assert_eq!(Mode::from_short_name(mode.short_name()), Some(mode));
        }
        assert_eq!(Mode::from_short_name("nope"), None);
    }

    #[test]
    fn test_mode_engines() {
        assert_eq!(Mode::Classic.engine(), "b");
        assert_eq!(Mode::Grapple.engine(), "b");
        assert_eq!(Mode::Football.engine(), "f");
    }

    #[test]
    fn test_region_address() {
        assert_eq!(
            ServerRegion::Warsaw.socket_address(),
            "wss://b2warsaw1.bonk.io/socket.io/?EIO=3&transport=websocket"
        );
        assert_eq!(ServerRegion::Mississippi.host(), "b2river1");
        assert_eq!(ServerRegion::NewYork.country(), "US");
    }
}
