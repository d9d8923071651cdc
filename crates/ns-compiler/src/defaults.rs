//! Built-in baseline list
//!
//! Registered by [`Engine::with_default_lists`](crate::Engine::with_default_lists)
//! so the engine blocks the most common ad and tracker hosts before any
//! subscription has been fetched.

pub const DEFAULT_LIST_NAME: &str = "netsieve-baseline";

pub const DEFAULT_LIST: &str = r#"[Adblock Plus 2.0]
! Title: NetSieve baseline
! Ad servers
||doubleclick.net^
||googleadservices.com^
@@||googleadservices.com/safe^
||googlesyndication.com^
||amazon-adsystem.com^
||adnxs.com^
||adsrvr.org^
||taboola.com^
||outbrain.com^
||criteo.com^
||moatads.com^
! Trackers
||google-analytics.com^
||facebook.com/tr^
||scorecardresearch.com^
||hotjar.com^$third-party
! Video ads
||youtube.com/api/stats/ads^
||youtube.com/pagead/
||youtube.com/ptracking^
! Generic paths
/adsbygoogle.js
/pagead2.
! Cosmetic
##.ad-banner
##.adsbygoogle
##div[id^="div-gpt-ad"]
youtube.com##.ytd-promoted-video-renderer
"#;
