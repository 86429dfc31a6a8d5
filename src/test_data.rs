#[cfg(test)]
pub const POST_BACK_BUTTON: &str = r##"---
layout: post
title: Custom Back Button in SwiftUI
date: 2025-11-23 10:00:00 +0800
description: Replacing the navigation back button
categories: [iOS, SwiftUI]
tags: [Swift, SwiftUI, navigation]
pin: true
---

SwiftUI hides the system back button when you set `navigationBarBackButtonHidden(true)`.

See [how to read the app icon](/posts/accessing-the-app-icon/) for another trick.

```swift
// [not a link](/posts/inside-code)
struct BackButton: View {}
```
"##;

#[cfg(test)]
pub const POST_TOML: &str = r##"+++
title = "Accessing the App Icon"
date = 2025-10-02T08:30:00+02:00
tags = ["ios", "UIKit"]
weight = 3
+++
Reading the icon from the bundle.
"##;

#[cfg(test)]
pub const POST_TEXTED: &str = r##"<!--
[ID]: # (21c1e9ad-4ebb-4168-a543-fbf77cc35a85)
[DATE]: # (2024-02-12 22:54:00 +0000)
[TAGS]: # (design oop)
-->

# Composite Reuse Principle

Prefer composition: a `Ship` has a `Cannon` instead of being one.
Back buttons again: {% post_url 2025-11-23-custom-back-button %}
and [a missing one](/posts/nonexistent-post/).
"##;

#[cfg(test)]
pub const POST_HTML: &str = r##"---
title: Icons in HTML
date: 2025-09-01 12:00:00 +0000
tags: [iOS]
---
<h1>Icons in HTML</h1>
<p>Read <a href="/posts/accessing-the-app-icon/#bundle">this</a> and <a href="/posts/gone">that</a>.</p>
"##;

/// Builds a minimal YAML post.
#[cfg(test)]
pub fn yaml_post(title: &str, date: &str, tags: &[&str], body: &str) -> String {
    format!("---\ntitle: {}\ndate: {}\ntags: [{}]\ncategories: [Blog]\n---\n{}", title, date, tags.join(", "), body)
}
