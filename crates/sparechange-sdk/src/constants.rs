// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

use std::time::Duration;

/// Root key of the plugin data
pub const ROOT_KEY: &str = "DonateSpareChange__Data__v00";

// Periodic check
pub const CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Wallet label prefix
pub const DEFAULT_LABEL: &str = "Donate Change";

/// Default charities: `(enabled, name, address)`
pub const DEFAULT_CHARITIES: [(bool, &str, &str); 13] = [
    (true, "eatBCH", "pp8skudq3x5hzw8ew7vzsw8tn4k8wxsqsv0lt0mf3g"),
    (true, "eatBCH_SS", "qrsrvtc95gg8rrag7dge3jlnfs4j9pe0ugrmeml950"),
    (true, "Coins4Clothes", "qzx4tqcldmvs4up9mewkf3ru0z6vy9wm6qm782fwla"),
    (false, "Calin", "qplw0d304x9fshz420lkvys2jxup38m9symky6k028"),
    (false, "CashShuffle", "qqqxxmjyavdkwdj6npa5w6xl0fzq3wc5furaqdpl59"),
    (false, "Electron-Cash", "qz4wq9m860zr5p2nfdpttm5ymdqdyt3psc95qjagae"),
    (false, "bchd", "qrhea03074073ff3zv9whh0nggxc7k03ssh8jv9mkx"),
    (false, "CrescentCash", "qptnypuugy29lttleggl7l0vpls0vg295q9nsavw6g"),
    (false, "FloweeTheHub", "qpgn5ka4jptc98a9ftycvujxx33e79nxuqlz5mvxns"),
    (false, "Bitcoin-ABC", "qqeht8vnwag20yv8dvtcrd4ujx09fwxwsqqqw93w88"),
    (false, "Chaintip", "qpznjz9qd0fl5fe9sfrkuy8rznt8qw066yvkgsezy5"),
    (false, "Gitcash", "qrdf9w034w9l7lgu7yt2tem7403paeky2geytpuccn"),
    (false, "CashAddress", "qp4atx0z6h6atuzchuaqssnkdqag95ecdqtt5nx8z8"),
];
